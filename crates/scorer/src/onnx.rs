//! ONNX-backed amusement scorer

use crate::frame::DecodedFrame;
use crate::{FrameScorer, ScoreOutcome, ScorerConfig, ScorerError};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Luma variance below which a frame is treated as faceless (covered lens,
/// blank wall)
const FLAT_FRAME_VARIANCE: f32 = 5e-4;

/// Production scorer: a 7-class emotion network over a square grayscale
/// crop, with the happiness channel as the amusement score.
///
/// Without a configured model path it degrades to a deterministic
/// brightness heuristic so the full stack still runs end to end.
pub struct OnnxScorer {
    config: ScorerConfig,
    session: Option<Mutex<Session>>,
}

impl OnnxScorer {
    pub fn new(config: ScorerConfig) -> Result<Self, ScorerError> {
        let session = match &config.model_path {
            Some(path) => {
                info!("Loading emotion model from {}", path);
                let session = Session::builder()
                    .map_err(|e| ScorerError::ModelLoad(e.to_string()))?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .map_err(|e| ScorerError::ModelLoad(e.to_string()))?
                    .commit_from_file(path)
                    .map_err(|e| ScorerError::ModelLoad(e.to_string()))?;
                Some(Mutex::new(session))
            }
            None => {
                warn!("No emotion model path configured, using brightness heuristic");
                None
            }
        };

        Ok(Self { config, session })
    }

    /// Resize to the model's square input and normalize luma to [0, 1]
    fn preprocess(&self, frame: &DecodedFrame) -> Result<Array4<f32>, ScorerError> {
        let img = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
            frame.width,
            frame.height,
            frame.data.clone(),
        )
        .ok_or_else(|| ScorerError::InvalidFrame("RGB buffer mismatch".to_string()))?;

        let size = self.config.input_size;
        let resized =
            image::imageops::resize(&img, size, size, image::imageops::FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 1, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let luma =
                0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;
            input[[0, 0, y as usize, x as usize]] = luma / 255.0;
        }
        Ok(input)
    }

    fn score_with_model(
        &self,
        session: &Mutex<Session>,
        frame: &DecodedFrame,
    ) -> Result<ScoreOutcome, ScorerError> {
        let input = Tensor::from_array(self.preprocess(frame)?)
            .map_err(|e| ScorerError::Inference(e.to_string()))?;

        let mut session = session
            .lock()
            .map_err(|e| ScorerError::Inference(e.to_string()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ScorerError::Inference(e.to_string()))?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ScorerError::Inference(e.to_string()))?;
        let logits: Vec<f32> = data.to_vec();

        if logits.len() <= self.config.happy_index {
            return Err(ScorerError::Inference(format!(
                "Model produced {} outputs, happy channel is {}",
                logits.len(),
                self.config.happy_index
            )));
        }

        // Softmax over emotion logits, take the happiness probability
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        let score = exp[self.config.happy_index] / sum;

        debug!(score, "Model amusement score");
        Ok(ScoreOutcome::Detected {
            score,
            confidence: 0.95,
        })
    }

    /// Fallback scoring when no model is configured: mouth-region
    /// brightness as a stand-in amusement signal.
    fn score_heuristic(&self, frame: &DecodedFrame) -> ScoreOutcome {
        // Mean luma of the lower half, where a smile would be
        let mid = frame.height / 2;
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for y in mid..frame.height {
            for x in 0..frame.width {
                if let Some(l) = frame.luma(x, y) {
                    sum += l;
                    count += 1;
                }
            }
        }
        if count == 0 {
            return ScoreOutcome::NoFace;
        }

        ScoreOutcome::Detected {
            score: (sum / count as f32).clamp(0.0, 1.0),
            confidence: self.config.heuristic_confidence,
        }
    }

    /// A frame with essentially no luma variation has no face in it
    fn is_flat(frame: &DecodedFrame) -> bool {
        let mean = frame.mean_luma();
        let pixels = (frame.data.len() / 3).max(1);
        let variance: f32 = frame
            .data
            .chunks_exact(3)
            .map(|px| {
                let l = (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
                    / 255.0;
                (l - mean) * (l - mean)
            })
            .sum::<f32>()
            / pixels as f32;
        variance < FLAT_FRAME_VARIANCE
    }
}

impl FrameScorer for OnnxScorer {
    fn score_frame(&self, frame: &DecodedFrame) -> Result<ScoreOutcome, ScorerError> {
        if Self::is_flat(frame) {
            debug!("Flat frame, reporting no face");
            return Ok(ScoreOutcome::NoFace);
        }

        match &self.session {
            Some(session) => self.score_with_model(session, frame),
            None => Ok(self.score_heuristic(frame)),
        }
    }

    fn backend(&self) -> &str {
        if self.session.is_some() {
            "onnx"
        } else {
            "heuristic"
        }
    }

    fn is_model_loaded(&self) -> bool {
        self.session.is_some()
    }
}
