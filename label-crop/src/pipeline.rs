/// Label cropping pipeline:
/// 1. Parse the image data URI (fail fast on malformed input)
/// 2. Ask the label detector for boxes
/// 3. Decode the image once
/// 4. Per box: map to pixels, crop, store as PNG
/// 5. Collect the boxes that made it, index-aligned with their crops
///
/// Per-box failures are logged and skipped; everything else fails the request.

use crate::detector::LabelDetector;
use crate::error::AppError;
use crate::postprocess::mapping::{map_to_pixel_rect, NormalizedBox};
use crate::preprocess::crop::crop_png;
use crate::preprocess::data_uri::parse_data_uri;
use crate::preprocess::decode::{decode_image, read_dimensions, DecodedImage};
use crate::storage::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropResult {
    pub id: String,
    pub url: String,
    /// Box as returned by the detector, for overlay rendering.
    pub bbox: NormalizedBox,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingResult {
    pub crops: Vec<CropResult>,
    pub bboxes: Vec<NormalizedBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub id: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

pub struct Pipeline {
    detector: Arc<dyn LabelDetector>,
    store: Arc<dyn ObjectStore>,
    crop_prefix: String,
    original_prefix: String,
}

impl Pipeline {
    pub fn new(
        detector: Arc<dyn LabelDetector>,
        store: Arc<dyn ObjectStore>,
        crop_prefix: impl Into<String>,
        original_prefix: impl Into<String>,
    ) -> Self {
        Self {
            detector,
            store,
            crop_prefix: crop_prefix.into(),
            original_prefix: original_prefix.into(),
        }
    }

    /// Detect, crop and store every label in the image.
    pub async fn process(&self, image_data_uri: &str) -> Result<ProcessingResult, AppError> {
        let start = Instant::now();
        let result = self.run(image_data_uri).await;

        match &result {
            Ok(result) => info!(
                crops = result.crops.len(),
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Label pipeline finished"
            ),
            Err(e) => error!("Label pipeline failed: {e}"),
        }

        result
    }

    async fn run(&self, image_data_uri: &str) -> Result<ProcessingResult, AppError> {
        let input = parse_data_uri(image_data_uri)?;

        // The detector gets the URI as received, not the decoded bytes.
        let boxes = self.detector.detect(image_data_uri).await?;
        if boxes.is_empty() {
            info!("No labels detected");
            return Ok(ProcessingResult::default());
        }

        let bytes = input.bytes;
        let image = tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| AppError::Internal(format!("Join error: {e}")))??;
        info!(
            width = image.width,
            height = image.height,
            boxes = boxes.len(),
            "Cropping detected labels"
        );
        let image = Arc::new(image);

        let mut result = ProcessingResult::default();
        for (index, bbox) in boxes.into_iter().enumerate() {
            match self.crop_and_store(&image, &bbox).await {
                Ok(crop) => {
                    result.crops.push(crop);
                    result.bboxes.push(bbox);
                }
                Err(e) => warn!(index, ?bbox, "Skipping label: {e}"),
            }
        }

        Ok(result)
    }

    async fn crop_and_store(
        &self,
        image: &Arc<DecodedImage>,
        bbox: &NormalizedBox,
    ) -> Result<CropResult, AppError> {
        let rect = map_to_pixel_rect(bbox, image.width, image.height);

        let source = Arc::clone(image);
        let png = tokio::task::spawn_blocking(move || crop_png(&source, &rect))
            .await
            .map_err(|e| AppError::Internal(format!("Join error: {e}")))??;

        let id = Uuid::new_v4().to_string();
        let key = format!("{prefix}/{id}.png", prefix = self.crop_prefix);
        let stored = self.store.put(&key, png, "image/png").await?;

        Ok(CropResult {
            id,
            url: stored.url,
            bbox: *bbox,
        })
    }

    /// Store the uploaded original unchanged, next to its crops.
    pub async fn store_original(&self, image_data_uri: &str) -> Result<UploadResult, AppError> {
        let input = parse_data_uri(image_data_uri)?;
        let (width, height) = read_dimensions(&input.bytes)?;

        let id = Uuid::new_v4().to_string();
        let key = format!(
            "{prefix}/{id}.{ext}",
            prefix = self.original_prefix,
            ext = input.extension()
        );
        let stored = self.store.put(&key, input.bytes, &input.media_type).await?;
        info!(key = %stored.key, width, height, "Stored original");

        Ok(UploadResult {
            id,
            url: stored.url,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::client::parse_boxes;
    use crate::testing::{coordinate_data_uri, label, FakeDetector, MemoryStore};

    fn pipeline(detector: &Arc<FakeDetector>, store: &Arc<MemoryStore>) -> Pipeline {
        Pipeline::new(detector.clone(), store.clone(), "wine-crops", "wine-originals")
    }

    #[tokio::test]
    async fn no_labels_is_an_empty_success() {
        let detector = Arc::new(FakeDetector::returning(Vec::new()));
        let store = Arc::new(MemoryStore::default());

        let result = pipeline(&detector, &store)
            .process(&coordinate_data_uri(10, 10))
            .await
            .unwrap();

        assert_eq!(result, ProcessingResult::default());
        assert_eq!(detector.calls(), 1);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn unparsable_detection_is_an_empty_success() {
        let detector = Arc::new(FakeDetector::returning(parse_boxes("sorry, no JSON today")));
        let store = Arc::new(MemoryStore::default());

        let result = pipeline(&detector, &store)
            .process(&coordinate_data_uri(10, 10))
            .await
            .unwrap();

        assert!(result.crops.is_empty());
        assert!(result.bboxes.is_empty());
    }

    #[tokio::test]
    async fn malformed_input_fails_before_detection() {
        let detector = Arc::new(FakeDetector::returning(vec![label(0.0, 0.0, 10.0, 10.0)]));
        let store = Arc::new(MemoryStore::default());

        let err = pipeline(&detector, &store)
            .process("not-a-data-uri")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test]
    async fn detector_transport_failure_is_fatal() {
        let detector = Arc::new(FakeDetector::failing("connection reset"));
        let store = Arc::new(MemoryStore::default());

        let err = pipeline(&detector, &store)
            .process(&coordinate_data_uri(10, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Detector(_)));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn undecodable_image_is_fatal() {
        let detector = Arc::new(FakeDetector::returning(vec![label(0.0, 0.0, 10.0, 10.0)]));
        let store = Arc::new(MemoryStore::default());

        // valid data URI, payload is not an image
        let err = pipeline(&detector, &store)
            .process("data:image/png;base64,bm90IGFuIGltYWdl")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ImageDecode(_)));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn crops_padded_region_as_png() {
        let detector = Arc::new(FakeDetector::returning(vec![label(100.0, 200.0, 500.0, 700.0)]));
        let store = Arc::new(MemoryStore::default());

        let result = pipeline(&detector, &store)
            .process(&coordinate_data_uri(200, 100))
            .await
            .unwrap();

        assert_eq!(result.crops.len(), 1);
        let objects = store.objects.lock().unwrap();
        assert_eq!(objects[0].content_type, "image/png");

        // x: 40 + 100 wide, pad 5; y: 10 + 40 high, pad 2
        let crop = image::load_from_memory(&objects[0].bytes).unwrap().to_rgba8();
        assert_eq!(crop.dimensions(), (110, 44));
        assert_eq!(crop.get_pixel(0, 0).0, [35, 8, 7, 255]);
    }

    #[tokio::test]
    async fn failed_box_is_skipped_and_arrays_stay_aligned() {
        let boxes = vec![
            label(0.0, 0.0, 100.0, 100.0),
            label(200.0, 200.0, 300.0, 300.0),
            label(500.0, 500.0, 900.0, 900.0),
        ];
        let detector = Arc::new(FakeDetector::returning(boxes.clone()));
        let store = Arc::new(MemoryStore::failing_on(1));

        let result = pipeline(&detector, &store)
            .process(&coordinate_data_uri(50, 50))
            .await
            .unwrap();

        assert_eq!(result.crops.len(), 2);
        assert_eq!(result.bboxes, vec![boxes[0], boxes[2]]);
        for (crop, bbox) in result.crops.iter().zip(&result.bboxes) {
            assert_eq!(&crop.bbox, bbox);
        }
    }

    #[tokio::test]
    async fn crops_are_namespaced_and_unique() {
        let boxes = vec![label(0.0, 0.0, 500.0, 500.0), label(0.0, 0.0, 500.0, 500.0)];
        let detector = Arc::new(FakeDetector::returning(boxes));
        let store = Arc::new(MemoryStore::default());

        let result = pipeline(&detector, &store)
            .process(&coordinate_data_uri(20, 20))
            .await
            .unwrap();

        assert_eq!(result.crops.len(), 2);
        assert_ne!(result.crops[0].id, result.crops[1].id);
        for crop in &result.crops {
            let key = format!("wine-crops/{}.png", crop.id);
            assert_eq!(crop.url, format!("https://store.test/{key}"));
            assert!(store.keys().contains(&key));
        }
    }

    #[tokio::test]
    async fn inverted_box_keeps_its_original_coordinates() {
        let inverted = label(900.0, 800.0, 100.0, 200.0);
        let detector = Arc::new(FakeDetector::returning(vec![inverted]));
        let store = Arc::new(MemoryStore::default());

        let result = pipeline(&detector, &store)
            .process(&coordinate_data_uri(40, 40))
            .await
            .unwrap();

        assert_eq!(result.bboxes, vec![inverted]);
        assert_eq!(result.crops[0].bbox, inverted);
    }

    #[tokio::test]
    async fn stores_original_unchanged() {
        let detector = Arc::new(FakeDetector::returning(Vec::new()));
        let store = Arc::new(MemoryStore::default());
        let uri = coordinate_data_uri(30, 20);

        let upload = pipeline(&detector, &store).store_original(&uri).await.unwrap();

        assert_eq!((upload.width, upload.height), (30, 20));
        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, format!("wine-originals/{}.png", upload.id));
        assert_eq!(objects[0].content_type, "image/png");
        assert_eq!(objects[0].bytes, parse_data_uri(&uri).unwrap().bytes);
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test]
    async fn original_must_be_a_readable_image() {
        let detector = Arc::new(FakeDetector::returning(Vec::new()));
        let store = Arc::new(MemoryStore::default());

        let err = pipeline(&detector, &store)
            .store_original("data:image/png;base64,bm90IGFuIGltYWdl")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ImageDecode(_)));
        assert!(store.keys().is_empty());
    }
}
