use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shoushi::config::DetectConfig;
use shoushi::detection::{BoundingBox, DetectionBox, ImageSize};
use shoushi::label::LabelTable;
use shoushi::postprocess::{PostProcessor, non_max_suppression};
use shoushi::tensor::{Quantization, RawOutputTensor};

const CLASSES: usize = 4;
const ATTRIBUTES: usize = 5 + CLASSES;

fn random_tensor(rng: &mut StdRng, predictions: usize) -> RawOutputTensor {
  let mut data = vec![0.0f32; ATTRIBUTES * predictions];
  for p in 0..predictions {
    let row = [
      rng.random_range(-50.0..700.0),
      rng.random_range(-50.0..700.0),
      rng.random_range(0.0..300.0),
      rng.random_range(0.0..300.0),
      rng.random_range(0.0..1.0),
    ];
    for (a, value) in row.into_iter().enumerate() {
      data[a * predictions + p] = value;
    }
    for c in 0..CLASSES {
      data[(5 + c) * predictions + p] = rng.random_range(0.0..1.0);
    }
  }
  RawOutputTensor::from_f32([1, ATTRIBUTES, predictions], &data).unwrap()
}

fn random_box(rng: &mut StdRng) -> BoundingBox {
  let left = rng.random_range(0.0..500.0);
  let top = rng.random_range(0.0..500.0);
  BoundingBox::new(
    left,
    top,
    left + rng.random_range(1.0..140.0),
    top + rng.random_range(1.0..140.0),
  )
}

fn random_detections(rng: &mut StdRng, n: usize) -> Vec<DetectionBox> {
  (0..n)
    .map(|_| DetectionBox {
      bbox: random_box(rng),
      confidence: rng.random_range(0.0..1.0),
      class_index: rng.random_range(0..3),
      class_name: String::new(),
    })
    .collect()
}

fn is_sorted_desc(boxes: &[DetectionBox]) -> bool {
  boxes.windows(2).all(|w| w[0].confidence >= w[1].confidence)
}

#[test]
fn pipeline_output_is_bounded_sorted_and_limited() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  let labels = Arc::new(LabelTable::from_names(["a", "b", "c", "d"]));
  let config = DetectConfig::default();
  let mut processor = PostProcessor::new(config, labels);

  for _ in 0..50 {
    let image = ImageSize::new(rng.random_range(1..1920), rng.random_range(1..1080));
    let predictions = rng.random_range(1..200);
    let tensor = random_tensor(&mut rng, predictions);
    let boxes = processor.process(&tensor, image).unwrap();

    assert!(boxes.len() <= config.max_detections);
    assert!(is_sorted_desc(&boxes));
    for det in &boxes {
      assert!(det.confidence > config.confidence_threshold);
      assert!(det.bbox.left >= 0.0 && det.bbox.left < det.bbox.right);
      assert!(det.bbox.top >= 0.0 && det.bbox.top < det.bbox.bottom);
      assert!(det.bbox.right <= image.width as f32);
      assert!(det.bbox.bottom <= image.height as f32);
      assert!((0..CLASSES as i32).contains(&det.class_index));
    }
  }
}

#[test]
fn iou_is_symmetric_and_bounded() {
  let mut rng = StdRng::seed_from_u64(11);
  for _ in 0..500 {
    let a = random_box(&mut rng);
    let b = random_box(&mut rng);
    let ab = a.iou(&b);
    assert_eq!(ab, b.iou(&a));
    assert!((0.0..=1.0).contains(&ab));
    assert!((a.iou(&a) - 1.0).abs() < 1e-5);
  }
}

#[test]
fn nms_never_grows_and_is_idempotent() {
  let mut rng = StdRng::seed_from_u64(42);
  for _ in 0..100 {
    let n = rng.random_range(0..40);
    let input = random_detections(&mut rng, n);
    let once = non_max_suppression(input, 0.4);
    assert!(once.len() <= n);
    assert!(is_sorted_desc(&once));

    for (i, a) in once.iter().enumerate() {
      for b in &once[i + 1..] {
        if a.class_index == b.class_index {
          assert!(a.bbox.iou(&b.bbox) <= 0.4);
        }
      }
    }
    assert_eq!(non_max_suppression(once.clone(), 0.4), once);
  }
}

#[test]
fn quantization_round_trip_within_one_step() {
  let mut rng = StdRng::seed_from_u64(3);
  for _ in 0..200 {
    let scale = rng.random_range(0.001..0.1);
    let zero_point = rng.random_range(0..=255);
    let quant = Quantization::new(scale, zero_point).unwrap();

    let low = quant.dequantize(0);
    let high = quant.dequantize(255);
    let value = rng.random_range(low..=high);
    let restored = quant.dequantize(quant.quantize(value));
    assert!((restored - value).abs() <= scale as f32 * 0.5 + 1e-4);
  }
}
