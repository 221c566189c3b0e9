//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::handlers::alignment::{AlignmentRequest, AlignmentResponse};
use crate::handlers::health::{HealthResponse, ReadyResponse};
use crate::handlers::verify::{ProofResponse, VerifyResponse};
use crate::handlers::watermark::{ExtractedWatermark, WatermarkResponse};

/// Glow Protocol verification API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Glow Protocol - Verification API",
        version = "0.1.0",
        description = r#"
## Certified Clinical Photography

Every certified photo has its SHA-256 hash notarized on a Hedera Consensus
Service topic at capture time, and the delivered image carries an invisible
watermark pointing back at that record.

### How It Works

1. The capture app hashes the photo and anchors the hash on the clinic topic
2. The photo is watermarked with the hash, clinic, patient and ledger record
3. Anyone holding the photo can **inspect** the watermark via `POST /watermark`
4. And **verify** it against the ledger via `POST /verify`

A verdict is `certified` (hashes match), `modified` (record found, hashes
differ) or `unknown` (no readable record).
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/glow-protocol/glow/blob/main/LICENSE"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Verification", description = "Compare a photo with its ledger record"),
        (name = "Watermark", description = "Read the embedded provenance watermark"),
        (name = "Capture", description = "Capture-time helpers for clinical framing"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::verify::verify_handler,
        crate::handlers::watermark::watermark_handler,
        crate::handlers::alignment::alignment_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            VerifyResponse,
            ProofResponse,
            WatermarkResponse,
            ExtractedWatermark,
            AlignmentRequest,
            AlignmentResponse,
        )
    )
)]
pub struct ApiDoc;
