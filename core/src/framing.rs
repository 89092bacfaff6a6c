use crate::callsign;
use crate::config::ModemConfig;
use crate::crc::Crc;
use crate::error::{ModemError, Result};
use crate::xorshift::{descramble, scramble};
use crate::{
    CALL_SIGN_LIMIT, HEADER_BITS, HEADER_CRC_BITS, HEADER_CRC_POLY, META_BITS, PAYLOAD_CRC_BITS,
    PAYLOAD_CRC_POLY,
};

/// Decoded header: who is sending and how the payload is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub call_sign: u64,
    pub oper_mode: u8,
}

impl Metadata {
    pub fn new(call_sign: u64, oper_mode: u8) -> Result<Self> {
        check_call_sign(call_sign)?;
        Ok(Self {
            call_sign,
            oper_mode,
        })
    }

    /// 55-bit header word: call sign above the mode byte
    pub fn word(&self) -> u64 {
        (self.call_sign << 8) | self.oper_mode as u64
    }

    pub fn call_sign_text(&self) -> String {
        callsign::decode(self.call_sign)
    }
}

pub fn check_call_sign(call_sign: u64) -> Result<()> {
    if call_sign == 0 || call_sign >= CALL_SIGN_LIMIT {
        return Err(ModemError::InvalidCallSign(call_sign));
    }
    Ok(())
}

/// CRC-16 of a header word, computed over the word shifted to the top of 64 bits
pub fn header_crc(word: u64) -> u16 {
    Crc::new(HEADER_CRC_POLY).word(word << (64 - META_BITS)) as u16
}

pub struct HeaderEncoder;
pub struct HeaderDecoder;

impl HeaderEncoder {
    /// The 71 header bits (0/1): 55 word bits then 16 CRC bits, LSB first
    pub fn encode(meta: &Metadata) -> Vec<u8> {
        let word = meta.word();
        let crc = header_crc(word);
        let mut bits = Vec::with_capacity(HEADER_BITS);
        bits.extend((0..META_BITS).map(|i| ((word >> i) & 1) as u8));
        bits.extend((0..HEADER_CRC_BITS).map(|i| ((crc >> i) & 1) as u8));
        bits
    }
}

impl HeaderDecoder {
    /// Verify the CRC and the field ranges of 71 received header bits
    pub fn decode(bits: &[u8]) -> Result<Metadata> {
        if bits.len() < HEADER_BITS {
            return Err(ModemError::HeaderCrcMismatch);
        }
        let word = bits[..META_BITS]
            .iter()
            .enumerate()
            .fold(0u64, |w, (i, &b)| w | ((b as u64 & 1) << i));
        let crc = bits[META_BITS..HEADER_BITS]
            .iter()
            .enumerate()
            .fold(0u16, |c, (i, &b)| c | ((b as u16 & 1) << i));
        if header_crc(word) != crc {
            return Err(ModemError::HeaderCrcMismatch);
        }
        let oper_mode = (word & 0xFF) as u8;
        ModemConfig::lookup(oper_mode)?;
        Metadata::new(word >> 8, oper_mode)
    }
}

pub struct PayloadEncoder;
pub struct PayloadDecoder;

impl PayloadEncoder {
    /// NRZ message for the polar encoder: scrambled data bits (LSB first)
    /// followed by the CRC-32 of the scrambled bytes
    pub fn encode(config: &ModemConfig, data: &[u8], message: &mut Vec<i8>) -> Result<()> {
        if !config.has_payload() {
            return Err(ModemError::NoPayload);
        }
        let max = config.max_packet_len();
        if data.len() > max {
            return Err(ModemError::PacketTooLarge {
                len: data.len(),
                max,
            });
        }
        let mut bytes = vec![0u8; max];
        bytes[..data.len()].copy_from_slice(data);
        scramble(&mut bytes);
        let crc = Crc::new(PAYLOAD_CRC_POLY).bytes(&bytes);

        message.clear();
        message.extend(
            bytes
                .iter()
                .flat_map(|&b| (0..8).map(move |i| nrz_i8((b >> i) & 1 == 1))),
        );
        message.extend((0..PAYLOAD_CRC_BITS).map(|i| nrz_i8((crc >> i) & 1 == 1)));
        Ok(())
    }
}

impl PayloadDecoder {
    /// Check a candidate message and recover the descrambled payload
    ///
    /// Returns `None` when the CRC over data and check bits is not zero.
    pub fn decode<I>(config: &ModemConfig, candidate: I) -> Option<Vec<u8>>
    where
        I: IntoIterator<Item = i8>,
    {
        let data_bits = config.data_bits();
        let mut crc = Crc::new(PAYLOAD_CRC_POLY);
        let mut bytes = vec![0u8; config.max_packet_len()];
        let mut count = 0;
        for (i, v) in candidate
            .into_iter()
            .take(data_bits + PAYLOAD_CRC_BITS)
            .enumerate()
        {
            let bit = v < 0;
            crc.bit(bit);
            if i < data_bits && bit {
                bytes[i / 8] |= 1 << (i % 8);
            }
            count += 1;
        }
        if count != data_bits + PAYLOAD_CRC_BITS || crc.value() != 0 {
            return None;
        }
        descramble(&mut bytes);
        Some(bytes)
    }
}

fn nrz_i8(bit: bool) -> i8 {
    if bit {
        -1
    } else {
        1
    }
}
