// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::PinDef;
use super::{PinMode, Port};

/// TIM3 alternate function on PB4/PB5
const AF_TIM3: u8 = 2;

/// Crank sensor, TIM3_CH1
pub const CRANK: PinDef = PinDef::new(Port::B, 4, PinMode::Alt(AF_TIM3));

/// Cam sensor, TIM3_CH2
pub const CAM: PinDef = PinDef::new(Port::B, 5, PinMode::Alt(AF_TIM3));
