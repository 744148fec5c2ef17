pub(crate) mod config;
pub(crate) mod irq;
mod monitor;
mod store;

use esp_hal::{
    gpio::{Input, InputConfig, Io, Level, Output, OutputConfig, Pull},
    timer::{timg::TimerGroup, OneShotTimer},
};
use esp_println::println;
use quickshifter::engine::{EngineConfig, IgnitionCutEngine};

use self::{irq::IrqResources, store::ConfigStore};

pub(crate) fn run() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // TIMG1 timer0 is the one-shot deadline that ends an ignition cut.
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    let cut_timer = OneShotTimer::new(timg1.timer0);

    let io = Io::new(peripherals.IO_MUX);

    let sensor_cfg = InputConfig::default().with_pull(Pull::Down);
    let pickup = Input::new(peripherals.GPIO2, sensor_cfg);
    let shift = Input::new(peripherals.GPIO14, sensor_cfg);
    let override_btn = Input::new(peripherals.GPIO0, InputConfig::default().with_pull(Pull::Up));
    // Low = ignition enabled.
    let cut_output = Output::new(peripherals.GPIO15, Level::Low, OutputConfig::default());

    irq::install(
        io,
        IrqResources {
            pickup,
            shift,
            override_btn,
            cut_output,
            cut_timer,
        },
        IgnitionCutEngine::default(),
    );

    // The engine runs on defaults from the first edge on; a stored
    // configuration replaces them as soon as flash has been read.
    let mut config_store = ConfigStore::new(peripherals.FLASH);
    match config_store.load() {
        Some(stored) => {
            irq::set_config(stored);
            println!("[qs] configuration loaded from flash");
        }
        None => {
            // Seed the sector so the external configuration tool always
            // finds a valid record to edit.
            config_store.save(&EngineConfig::default());
            println!("[qs] no stored configuration, defaults written");
        }
    }
    if let Some(active) = irq::engine_config() {
        println!(
            "[qs] threshold {} rpm, debounce {} ms",
            active.min_rpm_threshold, active.debounce_time_ms
        );
    }

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(monitor::monitor_task());
    });
}

unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}
