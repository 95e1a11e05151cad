#![no_main]
#![no_std]

use beacon_c3::{console::UartConsole, esp_now_radio::EspNowRadio, DeepSleep};
use esp_hal::{
    delay::Delay,
    gpio::{Level, Output},
    prelude::*,
    rng::Rng,
    rtc_cntl::Rtc,
    timer::timg::TimerGroup,
};
use esp_wifi::esp_now::EspNow;
use static_cell::StaticCell;

use nowcast::{
    bring_up, console::line, fail, prepare_interface, split_frame_queue, BeaconConfig,
    Broadcaster, Console, FrameQueue, Halt, StatusLed,
};

static FRAMES: StaticCell<FrameQueue> = StaticCell::new();

#[entry]
fn main() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(72 * 1024);

    defmt::info!("Hello, world!");

    let cfg = BeaconConfig::DEFAULT;
    let mut halt = DeepSleep(Rtc::new(peripherals.LPWR));

    // UART0 TX is GPIO21 on the C3
    let mut console = match UartConsole::new(peripherals.UART0, peripherals.GPIO21, cfg.console_baud)
    {
        Ok(console) => console,
        Err(e) => {
            defmt::error!("Console bring-up failed: {:?}", e);
            halt.halt()
        }
    };
    line(&mut console, format_args!(""));

    let mut led = StatusLed::new(Output::new(peripherals.GPIO2, Level::High), cfg.led_active_low);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let wifi = match esp_wifi::init(
        timg0.timer0,
        Rng::new(peripherals.RNG),
        peripherals.RADIO_CLK,
    ) {
        Ok(wifi) => wifi,
        Err(e) => {
            defmt::error!("Wi-Fi init failed: {:?}", e);
            line(&mut console, format_args!("Wi-Fi init fail!"));
            console.flush();
            halt.halt()
        }
    };

    let esp_now = match EspNow::new(&wifi, peripherals.WIFI) {
        Ok(esp_now) => esp_now,
        Err(e) => {
            defmt::error!("ESP-NOW driver start failed: {:?}", e);
            line(&mut console, format_args!("esp_now_init() fail!"));
            line(&mut console, format_args!("ESP-NOW initialization fail!"));
            console.flush();
            halt.halt()
        }
    };
    let mut radio = EspNowRadio::new(esp_now);

    let (sink, drain) = split_frame_queue(FRAMES.init(FrameQueue::new()));

    prepare_interface(&mut radio, &mut console);
    if let Err(e) = bring_up(&mut radio, &cfg, sink) {
        defmt::error!("Bring-up failed at {:?}: {:?}", e.step, e.source);
        fail(&mut console, &e, &mut halt);
    }

    Broadcaster::new(cfg, drain).run(&mut radio, &mut led, &mut Delay::new(), &mut console)
}
