use airpacket_core::{Decoder, Encoder, ModemError, SliceSource};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn preamble(carrier: i32, lead: usize, noise_first: bool) -> Vec<i16> {
    let mut encoder = Encoder::new(Vec::new(), 8000).expect("Failed to create encoder");
    encoder.configure(carrier, 20).expect("Failed to configure encoder");
    if noise_first {
        encoder.noise_block().expect("Failed to emit noise block");
    }
    encoder.synchronization_symbol().expect("Failed to emit sync symbol");
    encoder.metadata_symbol(12345).expect("Failed to emit metadata");
    encoder.data_packet(b"sync").expect("Failed to emit packet");
    encoder.silence_packet().expect("Failed to emit silence");

    let mut samples = vec![0i16; lead];
    samples.extend(encoder.into_sink());
    samples
}

#[test]
fn test_detect_at_various_offsets() {
    init_logger();
    for lead in [100, 2345, 9000] {
        let samples = preamble(1500, lead, false);
        let mut decoder =
            Decoder::new(SliceSource::new(&samples), 8000).expect("Failed to create decoder");
        decoder
            .synchronization_symbol()
            .unwrap_or_else(|e| panic!("lead {}: {}", lead, e));
        let meta = decoder.metadata_symbol().expect("Failed to decode metadata");
        assert_eq!(meta.call_sign, 12345, "lead {}", lead);
        let data = decoder.data_packet().expect("Failed to decode packet");
        assert_eq!(&data[..4], b"sync");
    }
}

#[test]
fn test_silence_not_detected() {
    init_logger();
    let samples = vec![0i16; 40000];
    let mut decoder =
        Decoder::new(SliceSource::new(&samples), 8000).expect("Failed to create decoder");
    assert!(matches!(
        decoder.synchronization_symbol(),
        Err(ModemError::SyncNotFound)
    ));
    assert_eq!(decoder.source().position(), samples.len());
}

#[test]
fn test_noise_not_detected() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(99);
    let normal = Normal::new(0.0f32, 3000.0).expect("Failed to create distribution");
    let samples: Vec<i16> = (0..40000)
        .map(|_| normal.sample(&mut rng).round().clamp(-32768.0, 32767.0) as i16)
        .collect();
    let mut decoder =
        Decoder::new(SliceSource::new(&samples), 8000).expect("Failed to create decoder");
    assert!(matches!(
        decoder.synchronization_symbol(),
        Err(ModemError::SyncNotFound)
    ));
}

#[test]
fn test_noise_block_before_sync() {
    init_logger();
    let samples = preamble(1500, 500, true);
    let mut decoder =
        Decoder::new(SliceSource::new(&samples), 8000).expect("Failed to create decoder");
    decoder.synchronization_symbol().expect("Failed to find sync symbol");
    let meta = decoder.metadata_symbol().expect("Failed to decode metadata");
    assert_eq!(meta.oper_mode, 20);
}

#[test]
fn test_cfo_reports_carrier() {
    init_logger();
    for carrier in [900, 1200, 2450, 3100] {
        let samples = preamble(carrier, 700, false);
        let mut decoder =
            Decoder::new(SliceSource::new(&samples), 8000).expect("Failed to create decoder");
        decoder.synchronization_symbol().expect("Failed to find sync symbol");
        let cfo = decoder.cfo_hz();
        assert!(
            (cfo - carrier as f32).abs() < 1.0,
            "carrier {} measured {}",
            carrier,
            cfo
        );
    }
}

#[test]
fn test_sync_without_metadata_read() {
    init_logger();
    // two preambles back to back: searching again skips the first header
    let mut samples = preamble(1500, 300, false);
    samples.extend(preamble(2000, 3000, false));
    let mut decoder =
        Decoder::new(SliceSource::new(&samples), 8000).expect("Failed to create decoder");
    decoder.synchronization_symbol().expect("Failed to find first sync");
    decoder.synchronization_symbol().expect("Failed to find second sync");
    assert!((decoder.cfo_hz() - 2000.0).abs() < 1.0);
    decoder.metadata_symbol().expect("Failed to decode metadata");
}
