//! Acoustic OFDM packet modem
//!
//! Differential PSK/QAM over 6.25 Hz spaced tones, Schmidl-Cox synchronization,
//! a BCH-protected header recovered with ordered statistics decoding and
//! polar-coded payloads decoded with a CRC-aided list decoder.

pub mod error;
pub mod config;
pub mod ofdm;
pub mod crc;
pub mod bch;
pub mod mls;
pub mod xorshift;
pub mod shuffle;
pub mod filters;
pub mod theil_sen;
pub mod phasor;
pub mod modulation;
pub mod polar;
pub mod polar_list;
pub mod osd;
pub mod framing;
pub mod callsign;
pub mod sync;
pub mod stream;
pub mod encoder;
pub mod decoder;

pub use config::ModemConfig;
pub use decoder::{Decoder, PacketReport};
pub use encoder::Encoder;
pub use error::{ModemError, Result};
pub use framing::Metadata;
pub use modulation::Modulation;
pub use stream::{
    CancellableSink, CancellableSource, CancellationToken, IterSource, SampleSink, SampleSource,
    SliceSource,
};

// Sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 8000;
pub const BASE_SAMPLE_RATE: u32 = 8000;
pub const BASE_SYMBOL_LEN: usize = 1280;

// Synchronization sequence
pub const MLS0_LEN: usize = 127;
pub const MLS0_POLY: u32 = 0b1000_1001;

// Metadata sequence
pub const MLS1_LEN: usize = 255;
pub const MLS1_POLY: u32 = 0b1_0010_1011;

// Noise block sequence
pub const MLS2_POLY: u32 = 0b1001_0101_0001;

// Header layout: 55 metadata bits + 16 CRC bits, BCH(255,71)
pub const META_BITS: usize = 55;
pub const HEADER_CRC_BITS: usize = 16;
pub const HEADER_BITS: usize = META_BITS + HEADER_CRC_BITS; // 71
pub const HEADER_CRC_POLY: u32 = 0xA8F4;

// Payload CRC
pub const PAYLOAD_CRC_BITS: usize = 32;
pub const PAYLOAD_CRC_POLY: u32 = 0x8F6E_37A0;

// Xorshift32 seed shared by the scrambler and the bit shuffle
pub const XORSHIFT_SEED: u32 = 2_463_534_242;

// Polar code orders
pub const CODE_ORDER_MIN: u32 = 10;
pub const CODE_ORDER_MAX: u32 = 14;

// Call signs are nine base-37 digits
pub const CALL_SIGN_LIMIT: u64 = 129_961_739_795_077;

// Soft bits live in i8 with this magnitude limit
pub const SOFT_MAX: i8 = 127;

// Per-row precision ceiling for soft demapping
pub const PRECISION_MAX: f32 = 32.0;
