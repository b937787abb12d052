//! 边界框标注服务 - 业务能力层
//!
//! 把物体定位结果画到图片副本上：闭合多边形 + 置信度标签。

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::models::{AnnotatedImage, DetectedObject, DrawnPolygon};

/// 边框和文字颜色
const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// 边框粗细（像素）
const LINE_THICKNESS: i32 = 2;
/// 标签相对第一个顶点向上偏移
const LABEL_OFFSET_Y: i32 = 10;
const LABEL_SCALE: f32 = 24.0;

/// 随程序打包的标注字体
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// 边界框标注器
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    /// 使用内置字体
    pub fn new() -> Self {
        let font = match FontArc::try_from_slice(EMBEDDED_FONT) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("⚠️ 内置标注字体无效: {}，标签将不绘制文字", e);
                None
            }
        };
        Self { font }
    }

    /// 使用指定的 TrueType 字体文件，未指定时使用内置字体
    ///
    /// 字体读取或解析失败只记录警告并退回内置字体。
    pub fn with_font_file(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::new();
        };

        let font = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|data| FontArc::try_from_vec(data).map_err(|e| e.to_string()));

        match font {
            Ok(font) => Self { font: Some(font) },
            Err(e) => {
                warn!("⚠️ 无法加载标注字体 {}: {}，使用内置字体", path.display(), e);
                Self::new()
            }
        }
    }

    /// 解码图片并绘制所有物体的边界多边形
    ///
    /// 每个输入物体对应一个 `DrawnPolygon`，顺序一致。
    pub fn annotate(
        &self,
        image_bytes: &[u8],
        objects: &[DetectedObject],
    ) -> Result<AnnotatedImage, DecodeError> {
        if image_bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut canvas = image::load_from_memory(image_bytes)?.to_rgb8();
        let (width, height) = canvas.dimensions();
        debug!("标注图片 {}x{}，物体数量: {}", width, height, objects.len());

        let polygons = objects
            .iter()
            .map(|object| self.draw_object(&mut canvas, object))
            .collect();

        Ok(AnnotatedImage {
            image: canvas,
            width,
            height,
            polygons,
        })
    }

    fn draw_object(&self, canvas: &mut RgbImage, object: &DetectedObject) -> DrawnPolygon {
        let (width, height) = canvas.dimensions();
        let vertices: Vec<(i32, i32)> = object
            .vertices
            .iter()
            .map(|v| to_pixel(v.x, v.y, width, height))
            .collect();

        let edges: Vec<((i32, i32), (i32, i32))> = (0..vertices.len())
            .map(|i| (vertices[i], vertices[(i + 1) % vertices.len()]))
            .collect();

        for &(start, end) in &edges {
            draw_thick_line(canvas, start, end);
        }

        let label = object.label();
        let label_anchor = vertices
            .first()
            .map(|&(x, y)| (x, y - LABEL_OFFSET_Y));

        if let (Some(font), Some((x, y))) = (&self.font, label_anchor) {
            // 文字基线在锚点处，左上角需要再向上移一个字高
            let top = y - LABEL_SCALE as i32;
            draw_text_mut(
                canvas,
                ANNOTATION_COLOR,
                x,
                top,
                PxScale::from(LABEL_SCALE),
                font,
                &label,
            );
        }

        DrawnPolygon {
            vertices,
            edges,
            label,
            label_anchor,
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

/// 归一化坐标转像素坐标
pub fn to_pixel(x: f32, y: f32, width: u32, height: u32) -> (i32, i32) {
    (
        (x * width as f32).round() as i32,
        (y * height as f32).round() as i32,
    )
}

fn draw_thick_line(canvas: &mut RgbImage, start: (i32, i32), end: (i32, i32)) {
    for offset in 0..LINE_THICKNESS {
        let o = offset as f32;
        draw_line_segment_mut(
            canvas,
            (start.0 as f32 + o, start.1 as f32),
            (end.0 as f32 + o, end.1 as f32),
            ANNOTATION_COLOR,
        );
        draw_line_segment_mut(
            canvas,
            (start.0 as f32, start.1 as f32 + o),
            (end.0 as f32, end.1 as f32 + o),
            ANNOTATION_COLOR,
        );
    }
}

/// 编码为 PNG
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedVertex;

    fn blank_png(width: u32, height: u32) -> Vec<u8> {
        encode_png(&RgbImage::new(width, height)).unwrap()
    }

    fn square(name: &str, score: f32, min: f32, max: f32) -> DetectedObject {
        DetectedObject {
            name: name.to_string(),
            score,
            vertices: vec![
                NormalizedVertex { x: min, y: min },
                NormalizedVertex { x: max, y: min },
                NormalizedVertex { x: max, y: max },
                NormalizedVertex { x: min, y: max },
            ],
        }
    }

    #[test]
    fn test_one_closed_polygon_per_object() {
        let objects = vec![
            square("Cat", 0.91, 0.1, 0.4),
            square("Dog", 0.873, 0.5, 0.9),
            DetectedObject {
                name: "Empty".to_string(),
                score: 0.5,
                vertices: vec![],
            },
        ];

        let annotated = Annotator::new().annotate(&blank_png(100, 50), &objects).unwrap();

        assert_eq!(annotated.polygons.len(), objects.len());
        assert!(annotated.polygons[0].is_closed());
        assert!(annotated.polygons[1].is_closed());
        assert_eq!(annotated.polygons[0].edges.len(), 4);
        assert!(annotated.polygons[2].edges.is_empty());
        assert_eq!(annotated.polygons[1].label, "Dog (87.3% Confidence)");
    }

    #[test]
    fn test_vertices_scaled_and_drawn() {
        let objects = vec![square("Box", 0.5, 0.1, 0.5)];
        let annotated = Annotator::new().annotate(&blank_png(200, 100), &objects).unwrap();

        let polygon = &annotated.polygons[0];
        assert_eq!(polygon.vertices, vec![(20, 10), (100, 10), (100, 50), (20, 50)]);
        assert_eq!(polygon.label_anchor, Some((20, 0)));
        assert_eq!(*annotated.image.get_pixel(60, 10), ANNOTATION_COLOR);
        assert_eq!(*annotated.image.get_pixel(60, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_rounding_to_pixels() {
        assert_eq!(to_pixel(0.5, 0.5, 3, 3), (2, 2));
        assert_eq!(to_pixel(0.0, 1.0, 640, 480), (0, 480));
        assert_eq!(to_pixel(0.333, 0.666, 100, 100), (33, 67));
    }

    #[test]
    fn test_decode_errors() {
        let annotator = Annotator::new();
        assert_eq!(annotator.annotate(&[], &[]).unwrap_err(), DecodeError::Empty);
        assert!(matches!(
            annotator.annotate(b"definitely not an image", &[]),
            Err(DecodeError::Malformed { .. })
        ));
    }

    fn green_pixels(image: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| image.get_pixel(x, y)[1] > 0)
            .count()
    }

    #[test]
    fn test_label_drawn_above_first_vertex() {
        let object = DetectedObject {
            name: "Person".to_string(),
            score: 0.95,
            vertices: vec![
                NormalizedVertex { x: 0.2, y: 0.5 },
                NormalizedVertex { x: 0.9, y: 0.5 },
                NormalizedVertex { x: 0.9, y: 0.9 },
                NormalizedVertex { x: 0.2, y: 0.9 },
            ],
        };

        let annotated = Annotator::new()
            .annotate(&blank_png(200, 200), &[object])
            .unwrap();

        assert_eq!(annotated.polygons[0].label_anchor, Some((40, 90)));
        // 边框在 y=100 及以下，这一带只可能是标签文字
        assert!(green_pixels(&annotated.image, 40..200, 60..95) > 0);
        assert_eq!(green_pixels(&annotated.image, 0..40, 0..60), 0);
    }

    #[test]
    fn test_missing_font_falls_back_to_embedded() {
        let annotator = Annotator::with_font_file(Some(Path::new("/nonexistent/font.ttf")));
        let annotated = annotator
            .annotate(&blank_png(200, 200), &[square("Cat", 0.5, 0.5, 0.9)])
            .unwrap();

        // 第一个顶点 (100, 100)，标签在其上方
        assert!(green_pixels(&annotated.image, 100..200, 60..95) > 0);
    }
}
