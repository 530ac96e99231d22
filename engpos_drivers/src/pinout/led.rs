// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::PinDef;
use super::{PinMode, Port};

/// Lit while the decoder holds synchronization
pub const STATUS: PinDef = PinDef::new(Port::B, 14, PinMode::Output);

/// Lit while edges arrive but no landmark is found
pub const FAULT: PinDef = PinDef::new(Port::B, 15, PinMode::Output);
