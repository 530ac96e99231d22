#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;

use embedded_time::{duration::Milliseconds, rate::Hertz};
use hal::{self, clocks::Clocks, gpio::Pin, pac};

use engpos_algo::{
    decoder::{DecoderConfig, Polarity, ToothWheel},
    EngineDecoder,
};

use cortex_m;

const WHEEL: ToothWheel = ToothWheel::Wheel36m1;
const CAM_POLARITY: Polarity = Polarity::Rising;

// 1 us per tick: a 16-bit wrap every 65.5 ms
const CAPTURE_TICK: Hertz = Hertz(1_000_000);
const REPORT_PERIOD: Milliseconds<u32> = Milliseconds(500);

#[rtic::app(device = pac, peripherals = true)]
mod app {
    use super::*;

    use engpos_drivers::*;

    #[shared]
    struct Shared {
        decoder: EngineDecoder,
    }

    #[local]
    struct Local {
        capture: capture::CaptureTimer,
        status_led: Pin,
        fault_led: Pin,
        report_cycles: u32,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;
        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();

        let sysclk_freq = clock_cfg.sysclk(); // System clock frequency in Hz
        defmt::debug!("SYSTEM: Clock frequency is {} MHz", sysclk_freq / 1000000);

        let config = DecoderConfig::for_wheel(WHEEL).with_secondary_polarity(CAM_POLARITY);
        defmt::info!(
            "DECODER: {}-{} wheel, landmark at edge {}",
            config.teeth(),
            config.missing_teeth(),
            config.landmark_index()
        );
        let decoder = EngineDecoder::new(config);

        let mut capture = capture::CaptureTimer::new(dp.TIM3, &clock_cfg, CAPTURE_TICK.0);
        capture.begin();

        let mut status_led = pinout::led::STATUS.init();
        status_led.set_low();
        let mut fault_led = pinout::led::FAULT.init();
        fault_led.set_low();

        let report_cycles = sysclk_freq / 1000 * REPORT_PERIOD.0;

        (
            Shared { decoder },
            Local {
                capture,
                status_led,
                fault_led,
                report_cycles,
            },
        )
    }

    // Captures first, so an edge latched before a wrap still sees the pending overflow
    #[task(binds = TIM3, shared = [decoder], local = [capture], priority = 2)]
    fn tim3_capture(mut cx: tim3_capture::Context) {
        let capture = cx.local.capture;
        let counter_at_entry = capture.counter();

        cx.shared.decoder.lock(|decoder| {
            if let Some(event) = capture.take_primary(counter_at_entry) {
                decoder.on_primary_edge(event, &*capture);
            }
            if let Some(event) = capture.take_secondary(counter_at_entry) {
                decoder.on_secondary_edge(event, &*capture);
            }
            if capture.take_overflow() {
                decoder.on_timer_overflow();
            }
        });

        if capture.overcapture() {
            defmt::warn!("CAPTURE: edge overwritten before it was read");
        }
    }

    #[idle(shared = [decoder], local = [status_led, fault_led, report_cycles])]
    fn idle(mut cx: idle::Context) -> ! {
        let mut teeth_seen = 0u32;
        loop {
            cortex_m::asm::delay(*cx.local.report_cycles);

            let snapshot = cx.shared.decoder.lock(|decoder| decoder.snapshot());
            let turning = snapshot.primary_teeth_seen() != teeth_seen;
            teeth_seen = snapshot.primary_teeth_seen();

            if snapshot.position_valid() {
                cx.local.status_led.set_high();
                cx.local.fault_led.set_low();
            } else {
                cx.local.status_led.set_low();
                // Edges arrive but the landmark is not found
                if turning {
                    cx.local.fault_led.set_high();
                } else {
                    cx.local.fault_led.set_low();
                }
            }

            defmt::info!(
                "ENGINE: tooth {} ({}), period {} ticks, {} crank edges, cam {} ticks / {} teeth",
                snapshot.tooth_index,
                snapshot.sync_status,
                snapshot.last_full_tooth_period,
                snapshot.primary_teeth_seen(),
                snapshot.secondary_interval,
                snapshot.primary_pulses_per_secondary
            );
            defmt::debug!("ENGINE: {}", snapshot.diagnostics);
        }
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
