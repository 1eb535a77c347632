/// In-memory stand-ins for the detector and object store.

use crate::detector::LabelDetector;
use crate::error::AppError;
use crate::postprocess::mapping::NormalizedBox;
use crate::storage::{ObjectStore, StoredObject};
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn label(ymin: f64, xmin: f64, ymax: f64, xmax: f64) -> NormalizedBox {
    NormalizedBox { ymin, xmin, ymax, xmax }
}

/// PNG whose pixels encode their own coordinates: R = x, G = y, B = 7.
pub fn coordinate_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 7, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// [`coordinate_png`] as a data URI.
pub fn coordinate_data_uri(width: u32, height: u32) -> String {
    crate::preprocess::data_uri::to_data_uri("image/png", &coordinate_png(width, height))
}

pub struct FakeDetector {
    reply: Result<Vec<NormalizedBox>, String>,
    calls: AtomicUsize,
}

impl FakeDetector {
    pub fn returning(boxes: Vec<NormalizedBox>) -> Self {
        Self {
            reply: Ok(boxes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LabelDetector for FakeDetector {
    async fn detect(&self, _image_data_uri: &str) -> Result<Vec<NormalizedBox>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(AppError::Detector)
    }
}

pub struct StoredEntry {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Keeps objects in memory; optionally fails the n-th put (0-based).
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<Vec<StoredEntry>>,
    fail_on: Option<usize>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn failing_on(put_index: usize) -> Self {
        Self {
            fail_on: Some(put_index),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError> {
        let index = self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(index) {
            return Err(AppError::Storage(format!("simulated failure storing {key}")));
        }

        self.objects.lock().unwrap().push(StoredEntry {
            key: key.to_string(),
            bytes,
            content_type: content_type.to_string(),
        });

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("https://store.test/{key}"),
        })
    }
}
