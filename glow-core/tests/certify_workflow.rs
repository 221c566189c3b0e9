//! End-to-end certification: liveness, pipeline, journal-backed ledger and
//! third-party verification.

use std::sync::Arc;

use image::{ImageBuffer, Rgba, RgbaImage};

use glow_core::codec::{self, EncodeFormat};
use glow_core::liveness::DEFAULT_CHALLENGES;
use glow_core::watermark;
use glow_core::{
    compute_hash, CaptureAngle, CaptureInput, CapturePipeline, CertificationResult, GlowError,
    LedgerNotary, LivenessChallenge, LivenessConfig, LivenessDetector, LivenessFrame,
    LivenessState, MemoryConsensusLog, PhotoSeries, PipelineConfig, PipelineStep,
    VerificationService, VerificationStatus,
};

fn capture_png(width: u32, height: u32, tint: u8) -> Vec<u8> {
    let img: RgbaImage = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x * 3) as u8, (y * 5) as u8, tint.wrapping_add((x ^ y) as u8), 255])
    });
    codec::encode(img.as_raw(), width, height, EncodeFormat::Png).unwrap()
}

fn frames_for(challenge: LivenessChallenge) -> Vec<LivenessFrame> {
    match challenge {
        LivenessChallenge::Blink => vec![
            LivenessFrame::eyes(0.1),
            LivenessFrame::eyes(0.1),
            LivenessFrame::eyes(0.9),
        ],
        LivenessChallenge::TurnLeft => vec![LivenessFrame::yaw(30.0)],
        LivenessChallenge::TurnRight => vec![LivenessFrame::yaw(-30.0)],
        LivenessChallenge::Nod => vec![LivenessFrame::pitch(25.0)],
        LivenessChallenge::Smile => vec![LivenessFrame::smiling(0.9)],
    }
}

/// Answer whatever the detector asks until it settles.
fn pass_liveness(seed: u64) -> glow_core::LivenessPass {
    let mut detector = LivenessDetector::with_seed(LivenessConfig::default(), seed);
    detector.start(&DEFAULT_CHALLENGES).unwrap();
    while let Some(challenge) = detector.current_challenge() {
        for frame in frames_for(challenge) {
            detector.update(&frame);
        }
    }
    assert_eq!(detector.state(), LivenessState::Passed);
    detector.pass().unwrap()
}

async fn notary_with_topic() -> Arc<LedgerNotary> {
    let notary = LedgerNotary::new(Arc::new(MemoryConsensusLog::new()));
    notary.create_topic(Some("Harbor Aesthetics")).await.unwrap();
    Arc::new(notary)
}

#[tokio::test]
async fn test_live_capture_certifies_and_verifies() {
    let notary = notary_with_topic().await;
    let config = PipelineConfig {
        require_liveness: true,
        ..Default::default()
    };
    let pipeline = CapturePipeline::with_config(notary.clone(), config);
    let verifier = VerificationService::new(notary);

    let original = capture_png(80, 60, 17);
    let input = CaptureInput::new(original.clone(), "clinic-harbor", "patient-0042", "dr-okafor")
        .with_angle(CaptureAngle::FaceFrontal)
        .with_procedure("rhinoplasty")
        .with_device("Pixel 9 Pro")
        .with_liveness(pass_liveness(3));

    let mut steps = Vec::new();
    let result = pipeline
        .certify_with_progress(input, |p| steps.push(p.step))
        .await
        .unwrap();
    assert_eq!(steps.last(), Some(&PipelineStep::Complete));

    // The original bytes verify; the delivered watermarked copy carries the
    // proof but no longer hashes to the notarized digest.
    let certified = verifier.verify(&original, &result.hedera).await;
    assert_eq!(certified.status, VerificationStatus::Certified);
    assert_eq!(certified.hash, compute_hash(&original));

    let delivered = result.decrypt_image().unwrap();
    let embedded = watermark::extract_from_image(&delivered).unwrap();
    assert!(embedded.matches_proof(&result.hedera));
    assert_eq!(embedded.hash(), certified.hash);

    let tampered = verifier.verify(&delivered, &result.hedera).await;
    assert_eq!(tampered.status, VerificationStatus::Modified);
}

#[tokio::test]
async fn test_unproven_capture_is_refused() {
    let notary = notary_with_topic().await;
    let config = PipelineConfig {
        require_liveness: true,
        ..Default::default()
    };
    let pipeline = CapturePipeline::with_config(notary, config);
    let input = CaptureInput::new(capture_png(32, 32, 0), "c", "p", "u");

    let err = pipeline.certify(input).await.unwrap_err();
    assert!(matches!(err, GlowError::LivenessFailed(_)));
}

#[tokio::test]
async fn test_series_capture_gets_distinct_sequence_numbers() {
    let notary = notary_with_topic().await;
    let pipeline = CapturePipeline::new(notary.clone());

    let inputs: Vec<_> = PhotoSeries::FaceStandard
        .angles()
        .into_iter()
        .enumerate()
        .map(|(i, angle)| {
            CaptureInput::new(capture_png(64, 48, i as u8 * 40), "clinic", "patient", "dr")
                .with_angle(angle)
        })
        .collect();

    let results: Vec<CertificationResult> = pipeline
        .certify_series(inputs)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    let mut seqs: Vec<u64> = results.iter().map(|r| r.hedera.sequence_number).collect();
    seqs.sort_unstable();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);

    let verifier = VerificationService::new(notary);
    for result in &results {
        let status = verifier.verify_hash(&result.sha256_hash, &result.hedera).await.status;
        assert_eq!(status, VerificationStatus::Certified);
    }
}

#[tokio::test]
async fn test_journal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("ledger.json");
    let original = capture_png(64, 64, 99);

    let (topic, result) = {
        let log = MemoryConsensusLog::open_persistent(&journal).unwrap();
        let notary = LedgerNotary::new(Arc::new(log));
        let topic = notary.create_topic(None).await.unwrap();
        let pipeline = CapturePipeline::new(Arc::new(notary));
        let input = CaptureInput::new(original.clone(), "clinic", "patient", "dr");
        (topic, pipeline.certify(input).await.unwrap())
    };

    let log = MemoryConsensusLog::open_persistent(&journal).unwrap();
    let reopened = LedgerNotary::new(Arc::new(log));
    reopened.set_topic(topic).unwrap();
    let verifier = VerificationService::new(Arc::new(reopened));

    let bundle = CertificationResult::from_cbor(&result.to_cbor().unwrap()).unwrap();
    let outcome = verifier.verify(&original, &bundle.hedera).await;
    assert_eq!(outcome.status, VerificationStatus::Certified);
}
