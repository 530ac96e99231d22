// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

pub mod config;
pub mod primary;
pub mod ratio;
pub mod secondary;
pub mod wheel;

pub use config::{ConfigError, DecoderConfig};
pub use primary::{EdgeClass, PrimaryDecoder, SyncStatus};
pub use ratio::{Ratio, RatioWindow};
pub use secondary::SecondaryCapture;
pub use wheel::{Polarity, ToothWheel};
