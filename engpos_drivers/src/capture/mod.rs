// Input capture timer feeding the engine position decoder.

// Key Features:
// - TIM3 runs free over the full 16-bit range at a fixed tick rate
// - CH1 (crank) and CH2 (cam) latch the counter on both edges
// - The update interrupt marks a counter wrap for the time base extension
// - Captures are read out as `CaptureEvent`s with pin levels and overflow state

// Detailed Operation:
// All three sources share the TIM3 vector. The handler samples the counter once on
// entry, then takes the pending captures and finally the overflow. A capture is read
// while the update flag may still be set; the flag is reported with the event and
// cleared only after both channels have been handled.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    clocks::Clocks,
    gpio::Pin,
    pac::TIM3,
    timer::{
        Alignment, CaptureCompare, CaptureCompareDma, CountDir, Polarity, TimChannel, Timer,
        TimerConfig, TimerInterrupt, UpdateReqSrc,
    },
};

use engpos_algo::capture::{
    status, CaptureEvent, FreeRunningCounter, PRIMARY_INPUT_MASK, SECONDARY_INPUT_MASK,
};

use super::pinout;

pub struct CaptureTimer {
    tim: Timer<TIM3>,
    crank: Pin,
    cam: Pin,
}

impl CaptureTimer {
    /// Sets up TIM3 as a free-running 16-bit capture timer.
    ///
    /// # Arguments
    /// * `tim3` - timer peripheral
    /// * `clock_cfg` - system clocks, used for the prescaler
    /// * `tick_hz` - counter tick rate, e.g. 1 MHz
    pub fn new(tim3: TIM3, clock_cfg: &Clocks, tick_hz: u32) -> Self {
        let mut timer = Timer::new_tim3(
            tim3,
            // Placeholder update rate, prescaler and reload are set below
            1.0,
            TimerConfig {
                one_pulse_mode: false,
                update_request_source: UpdateReqSrc::OverUnderFlow,
                auto_reload_preload: false,
                alignment: Alignment::Edge,
                capture_compare_dma: CaptureCompareDma::Update,
                direction: CountDir::Up,
            },
            clock_cfg,
        );

        let prescaler = (clock_cfg.apb1_timer() / tick_hz).saturating_sub(1);
        timer.set_prescaler(prescaler as u16);
        timer.set_auto_reload(0xFFFF);

        // CCxS = 01 maps each channel to its own input, so CH2 also takes `InputTi1`.
        // CCxP and CCxNP both set: capture on both edges
        for channel in [TimChannel::C1, TimChannel::C2] {
            timer.set_input_capture(channel, CaptureCompare::InputTi1, Polarity::ActiveLow, Polarity::ActiveLow);
        }

        let crank = pinout::inputs::CRANK.init();
        let cam = pinout::inputs::CAM.init();

        CaptureTimer { tim: timer, crank, cam }
    }

    /// Enables the capture and overflow interrupts and starts counting.
    pub fn begin(&mut self) {
        self.tim.reset_count();
        // The HAL handles only the update source, capture flags go through the registers
        self.tim
            .regs
            .sr
            .write(|w| unsafe { w.bits(status::clear_word(status::UIF | status::CC1IF | status::CC2IF)) });

        self.tim.enable_interrupt(TimerInterrupt::Update);
        self.tim.regs.dier.modify(|_, w| w.cc1ie().set_bit().cc2ie().set_bit());
        self.tim.enable();
    }

    /// Raw 16-bit counter
    #[inline(always)]
    pub fn counter(&self) -> u16 {
        self.tim.regs.cnt.read().bits() as u16
    }

    #[inline(always)]
    fn overflow_pending(&self) -> bool {
        self.tim.regs.sr.read().uif().bit_is_set()
    }

    fn port_state(&self) -> u8 {
        let mut state = 0;
        if self.crank.is_high() {
            state |= PRIMARY_INPUT_MASK;
        }
        if self.cam.is_high() {
            state |= SECONDARY_INPUT_MASK;
        }
        state
    }

    /// Takes the crank capture if one is latched; reading CCR1 clears its flag.
    ///
    /// # Arguments
    /// * `counter_at_entry` - counter sampled first thing in the handler
    pub fn take_primary(&mut self, counter_at_entry: u16) -> Option<CaptureEvent> {
        if self.tim.regs.sr.read().cc1if().bit_is_clear() {
            return None;
        }
        Some(CaptureEvent {
            counter_at_entry,
            edge_stamp: self.tim.regs.ccr1.read().bits() as u16,
            port_state: self.port_state(),
            overflow_pending: self.overflow_pending(),
        })
    }

    /// Takes the cam capture if one is latched; reading CCR2 clears its flag.
    pub fn take_secondary(&mut self, counter_at_entry: u16) -> Option<CaptureEvent> {
        if self.tim.regs.sr.read().cc2if().bit_is_clear() {
            return None;
        }
        Some(CaptureEvent {
            counter_at_entry,
            edge_stamp: self.tim.regs.ccr2.read().bits() as u16,
            port_state: self.port_state(),
            overflow_pending: self.overflow_pending(),
        })
    }

    /// Clears the update flag, true if the counter wrapped since the last call
    pub fn take_overflow(&mut self) -> bool {
        if !self.overflow_pending() {
            return false;
        }
        self.tim.clear_interrupt(TimerInterrupt::Update);
        true
    }

    /// A capture arrived before the previous one was read
    pub fn overcapture(&mut self) -> bool {
        let sr = self.tim.regs.sr.read();
        let lost = sr.cc1of().bit_is_set() || sr.cc2of().bit_is_set();
        if lost {
            self.tim
                .regs
                .sr
                .write(|w| unsafe { w.bits(status::clear_word(status::CC1OF | status::CC2OF)) });
        }
        lost
    }
}

impl FreeRunningCounter for CaptureTimer {
    fn now(&self) -> u16 {
        self.counter()
    }
}
