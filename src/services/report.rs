//! 报告输出 - 业务能力层
//!
//! 每张图片写出一组文件：
//! `<name>` 为 `序号_图片名`，见 `AnalysisCtx::report_name`。
//!
//! - `<name>.json`：完整的 AggregateResult
//! - `<name>.annotated.png`：标注成功时
//! - `<name>.map.html`：有地标时
//! - `<name>.html`：分节展示的报告页面

use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{AggregateResult, ImagePayload, OcrOutcome};
use crate::services::annotation::encode_png;
use crate::workflow::AnalysisCtx;

/// 相似图片网格的列数
const GRID_COLUMNS: usize = 3;

const REPORT_TEMPLATE_NAME: &str = "report.html";

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>The Verification Dashboard - {{ image_name }}</title>
<style>
  body { font-family: sans-serif; max-width: 960px; margin: 0 auto; padding: 16px; }
  section { border-top: 1px solid #ccc; padding: 8px 0; }
  .error { color: #b00020; }
  .grid { display: grid; grid-template-columns: repeat({{ grid_columns }}, 1fr); gap: 8px; }
  .grid img, .uploaded img, .annotated img { max-width: 100%; }
  iframe { width: 100%; height: 420px; border: 0; }
  table { border-collapse: collapse; }
  td, th { border: 1px solid #ddd; padding: 4px 8px; text-align: left; }
</style>
</head>
<body>
<h1>The Verification Dashboard</h1>
<p>{{ image_name }} · {{ generated_at }}</p>

<section class="uploaded">
  <h2>📤 Uploaded image and detected location:</h2>
  {% if image_data_url %}<img src="{{ image_data_url }}" alt="{{ image_name }}">{% endif %}
  {% if map_file %}<iframe src="{{ map_file }}"></iframe>{% endif %}
</section>

<section>
{% if landmarks.state == "ok" %}
  <h2>📍 Location information:</h2>
  <ul>
  {% for landmark in landmarks.items %}
    <li><strong>Coordinates</strong>: {{ landmark.latitude }}, {{ landmark.longitude }}</li>
    <li><strong>Location</strong>: {{ landmark.description }}</li>
  {% endfor %}
  </ul>
{% elif landmarks.state == "empty" %}
  <p>{{ landmarks.items }}</p>
{% else %}
  <p class="error">❌ {{ landmarks.items }}</p>
{% endif %}
</section>

<section>
{% if logos.state == "ok" %}
  <h2>👓 Logos Detected:</h2>
  <ul>{% for logo in logos.items %}<li>{{ logo }}</li>{% endfor %}</ul>
{% elif logos.state == "empty" %}
  <p>{{ logos.items }}</p>
{% else %}
  <p class="error">❌ {{ logos.items }}</p>
{% endif %}
</section>

<section>
{% if objects.state == "ok" %}
  <h2>🧳 Objects Detected:</h2>
  <ul>{% for label in objects.items %}<li>{{ label }}</li>{% endfor %}</ul>
  <div class="annotated">
  {% if annotated_file %}<img src="{{ annotated_file }}" alt="annotated">
  {% elif annotation_error %}<p class="error">❌ Error loading image for object detection. ({{ annotation_error }})</p>{% endif %}
  </div>
{% elif objects.state == "empty" %}
  <p>{{ objects.items }}</p>
{% else %}
  <p class="error">❌ {{ objects.items }}</p>
{% endif %}
</section>

<section>
{% if web.state == "ok" %}
  <h2>🌐 Detected web entities:</h2>
  {% if web.items.entities %}
  <table>
    <tr><th>Description</th><th>Score</th></tr>
    {% for entity in web.items.entities %}<tr><td>{{ entity.description }}</td><td>{{ entity.score }}</td></tr>{% endfor %}
  </table>
  {% else %}<p>❌ No web entities detected.</p>{% endif %}

  <h2>🔗 Pages with matching images:</h2>
  {% if web.items.pages %}
  <ul>{% for url in web.items.pages %}<li><a href="{{ url }}">{{ url }}</a></li>{% endfor %}</ul>
  {% else %}<p>❌ No pages with matching images found.</p>{% endif %}
{% elif web.state == "empty" %}
  <p>{{ web.items }}</p>
{% else %}
  <p class="error">❌ {{ web.items }}</p>
{% endif %}
</section>

<section>
  <h2>📝 Text (OCR):</h2>
{% if ocr.state == "ok" %}
  <pre>{{ ocr.items }}</pre>
{% elif ocr.state == "empty" %}
  <p>{{ ocr.items }}</p>
{% else %}
  <p class="error">❌ {{ ocr.items }}</p>
{% endif %}
</section>

<section>
{% if similar_images.state == "ok" %}
  <h2>🖼️ Visually similar images:</h2>
  {% for row in similar_images.items %}
  <div class="grid">
    {% for url in row %}<figure><img src="{{ url }}" alt=""><figcaption>{{ url }}</figcaption></figure>{% endfor %}
  </div>
  {% endfor %}
{% elif similar_images.state == "empty" %}
  <p>{{ similar_images.items }}</p>
{% else %}
  <p class="error">❌ {{ similar_images.items }}</p>
{% endif %}
</section>

<section>
  <h2>OpenAI Response:</h2>
{% if narrative.state == "ok" %}
  <p style="white-space: pre-wrap">{{ narrative.items.text }}</p>
  {% if narrative.items.coordinates %}<p><strong>Estimated coordinates</strong>: {{ narrative.items.coordinates }}</p>{% endif %}
{% else %}
  <p class="error">API Error: {{ narrative.items }}</p>
{% endif %}
</section>
</body>
</html>
"#;

/// 单个报告分节的三种状态
#[derive(Debug, Serialize)]
#[serde(tag = "state", content = "items", rename_all = "snake_case")]
enum SectionView<T> {
    Ok(T),
    Empty(&'static str),
    Error(String),
}

/// 列表型分节：空列表和调用失败分开展示
fn list_section<T, U, E: Display>(
    result: &Result<Vec<U>, E>,
    empty_message: &'static str,
    render: impl Fn(&U) -> T,
) -> SectionView<Vec<T>> {
    match result {
        Ok(items) if items.is_empty() => SectionView::Empty(empty_message),
        Ok(items) => SectionView::Ok(items.iter().map(render).collect()),
        Err(e) => SectionView::Error(e.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct LandmarkRow {
    description: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct EntityRow {
    description: String,
    score: String,
}

#[derive(Debug, Serialize)]
struct WebView {
    entities: Vec<EntityRow>,
    pages: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NarrativeView {
    text: String,
    coordinates: Option<String>,
}

/// 报告页面的渲染数据
#[derive(Debug, Serialize)]
struct ReportView {
    image_name: String,
    generated_at: String,
    grid_columns: usize,
    image_data_url: Option<String>,
    map_file: Option<String>,
    annotated_file: Option<String>,
    annotation_error: Option<String>,
    landmarks: SectionView<Vec<LandmarkRow>>,
    logos: SectionView<Vec<String>>,
    objects: SectionView<Vec<String>>,
    web: SectionView<WebView>,
    ocr: SectionView<String>,
    similar_images: SectionView<Vec<Vec<String>>>,
    narrative: SectionView<NarrativeView>,
}

impl ReportView {
    fn build(
        ctx: &AnalysisCtx,
        image_bytes: &[u8],
        result: &AggregateResult,
        map_file: Option<String>,
        annotated_file: Option<String>,
    ) -> Self {
        let web = match &result.web {
            Ok(matches) => SectionView::Ok(WebView {
                entities: matches
                    .entities
                    .iter()
                    .filter(|entity| !entity.description.is_empty())
                    .map(|entity| EntityRow {
                        description: entity.description.clone(),
                        score: entity
                            .score
                            .map(|score| format!("{:.3}", score))
                            .unwrap_or_default(),
                    })
                    .collect(),
                pages: matches.page_urls().into_iter().map(String::from).collect(),
            }),
            Err(e) => SectionView::Error(e.to_string()),
        };

        let similar_images = match &result.web {
            Ok(matches) => {
                let urls = matches.similar_image_urls();
                if urls.is_empty() {
                    SectionView::Empty("❌ No visually similar images found.")
                } else {
                    SectionView::Ok(
                        urls.chunks(GRID_COLUMNS)
                            .map(|row| row.iter().map(|url| url.to_string()).collect())
                            .collect(),
                    )
                }
            }
            Err(_) => SectionView::Empty("❌ No web entities detected."),
        };

        let ocr = match &result.ocr {
            OcrOutcome::Text(text) => SectionView::Ok(text.clone()),
            OcrOutcome::NoText => SectionView::Empty("❌ No text detected."),
            OcrOutcome::Skipped => {
                SectionView::Empty("❌ No web entities detected, text detection skipped.")
            }
            OcrOutcome::Failed(e) => SectionView::Error(e.to_string()),
        };

        let narrative = match &result.narrative {
            Ok(description) => SectionView::Ok(NarrativeView {
                text: description.text.clone(),
                coordinates: description
                    .estimated_coordinates
                    .map(|c| format!("{}, {}", c.latitude, c.longitude)),
            }),
            Err(e) => SectionView::Error(e.to_string()),
        };

        let annotation_error = match &result.annotation {
            Some(Err(e)) => Some(e.to_string()),
            _ => None,
        };

        Self {
            image_name: ctx.image_name.clone(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            grid_columns: GRID_COLUMNS,
            image_data_url: ImagePayload::new(image_bytes.to_vec())
                .ok()
                .map(|payload| payload.data_url()),
            map_file,
            annotated_file,
            annotation_error,
            landmarks: list_section(
                &result.landmarks,
                "❌ No landmarks detected.",
                |landmark| LandmarkRow {
                    description: landmark.description.clone(),
                    latitude: landmark.location.latitude,
                    longitude: landmark.location.longitude,
                },
            ),
            logos: list_section(&result.logos, "❌ No Logos Detected.", |logo| {
                logo.description.clone()
            }),
            objects: list_section(
                &result.objects,
                "❌ No Objects Detected.",
                |object| object.label(),
            ),
            web,
            ocr,
            similar_images,
            narrative,
        }
    }
}

/// 写出的报告文件
#[derive(Debug, Clone, Default)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
    pub annotated_png: Option<PathBuf>,
    pub map_html: Option<PathBuf>,
}

/// 报告写入器
pub struct ReportWriter {
    output_dir: PathBuf,
    tera: Tera,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let mut tera = Tera::default();
        // 模板名以 .html 结尾，Tera 默认开启自动转义
        tera.add_raw_template(REPORT_TEMPLATE_NAME, REPORT_TEMPLATE)?;

        Ok(Self {
            output_dir: output_dir.into(),
            tera,
        })
    }

    /// 渲染报告页面
    pub fn render_html(
        &self,
        ctx: &AnalysisCtx,
        image_bytes: &[u8],
        result: &AggregateResult,
        map_file: Option<String>,
        annotated_file: Option<String>,
    ) -> AppResult<String> {
        let view = ReportView::build(ctx, image_bytes, result, map_file, annotated_file);
        let context = Context::from_serialize(&view)?;
        Ok(self.tera.render(REPORT_TEMPLATE_NAME, &context)?)
    }

    /// 写出一张图片的全部报告文件
    pub async fn write(
        &self,
        ctx: &AnalysisCtx,
        image_bytes: &[u8],
        result: &AggregateResult,
    ) -> AppResult<ReportPaths> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::io(&self.output_dir, e))?;

        let name = ctx.report_name();

        let json_path = self.output_dir.join(format!("{}.json", name));
        let json = serde_json::to_string_pretty(result)?;
        write_file(&json_path, json.into_bytes()).await?;

        let annotated_png = match &result.annotation {
            Some(Ok(annotated)) => {
                let path = self.output_dir.join(format!("{}.annotated.png", name));
                write_file(&path, encode_png(&annotated.image)?).await?;
                Some(path)
            }
            _ => None,
        };

        let map_html = match &result.map {
            Some(map) => {
                let path = self.output_dir.join(format!("{}.map.html", name));
                write_file(&path, map.to_html()?.into_bytes()).await?;
                Some(path)
            }
            None => None,
        };

        let html_path = self.output_dir.join(format!("{}.html", name));
        let html = self.render_html(
            ctx,
            image_bytes,
            result,
            map_html.as_deref().and_then(file_name),
            annotated_png.as_deref().and_then(file_name),
        )?;
        write_file(&html_path, html.into_bytes()).await?;

        info!("{} 💾 报告已保存: {}", ctx, html_path.display());

        Ok(ReportPaths {
            json: json_path,
            html: html_path,
            annotated_png,
            map_html,
        })
    }
}

async fn write_file(path: &Path, contents: Vec<u8>) -> AppResult<()> {
    debug!("写入 {} ({} 字节)", path.display(), contents.len());
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| AppError::io(path, e))
}

/// 页面里用相对路径引用同目录的文件
fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisCallError, DecodeError, NarrativeCallError};
    use crate::models::{
        AnalysisKind, AnnotatedImage, Landmark, LatLng, NarrativeDescription, WebImage,
        WebMatchResult,
    };
    use crate::services::geo_map::build_map;
    use image::RgbImage;

    fn failure(kind: AnalysisKind) -> AnalysisCallError {
        AnalysisCallError::QuotaExceeded {
            kind,
            message: "quota".to_string(),
        }
    }

    fn eiffel_result() -> AggregateResult {
        let landmarks = vec![Landmark {
            description: "Eiffel Tower".to_string(),
            location: LatLng::new(48.8584, 2.2945),
            score: Some(0.9),
        }];
        AggregateResult {
            map: build_map(&landmarks, 15),
            landmarks: Ok(landmarks),
            logos: Ok(vec![]),
            objects: Ok(vec![]),
            annotation: None,
            web: Ok(WebMatchResult::default()),
            ocr: OcrOutcome::Skipped,
            narrative: Ok(NarrativeDescription {
                text: "<script>alert(1)</script> Coordinates: 48.8584, 2.2945".to_string(),
                estimated_coordinates: Some(LatLng::new(48.8584, 2.2945)),
            }),
        }
    }

    #[test]
    fn test_render_sections() {
        let writer = ReportWriter::new("unused").unwrap();
        let ctx = AnalysisCtx::new(1, "eiffel");
        let html = writer
            .render_html(&ctx, b"", &eiffel_result(), Some("eiffel.map.html".into()), None)
            .unwrap();

        assert!(html.contains("📍 Location information:"));
        assert!(html.contains("Eiffel Tower"));
        assert!(html.contains("❌ No Logos Detected."));
        assert!(html.contains("❌ No Objects Detected."));
        assert!(html.contains("❌ No visually similar images found."));
        assert!(html.contains("eiffel.map.html"));
        // 模型输出必须被转义
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_error_states() {
        let result = AggregateResult {
            landmarks: Err(failure(AnalysisKind::Landmark)),
            logos: Err(failure(AnalysisKind::Logo)),
            objects: Ok(vec![crate::models::DetectedObject {
                name: "Cat".to_string(),
                score: 0.5,
                vertices: vec![],
            }]),
            annotation: Some(Err(DecodeError::Malformed {
                message: "bad header".to_string(),
            })),
            web: Err(failure(AnalysisKind::WebDetection)),
            ocr: OcrOutcome::Skipped,
            narrative: Err(NarrativeCallError::EmptyContent {
                model: "gpt-4o".to_string(),
            }),
            map: None,
        };

        let writer = ReportWriter::new("unused").unwrap();
        let html = writer
            .render_html(&AnalysisCtx::new(2, "broken"), b"", &result, None, None)
            .unwrap();

        assert!(html.contains("Cat (50.0% Confidence)"));
        assert!(html.contains("❌ Error loading image for object detection."));
        assert!(html.contains("API Error:"));
        assert!(html.contains("class=\"error\""));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn test_similar_images_grid_rows() {
        let mut result = eiffel_result();
        result.web = Ok(WebMatchResult {
            similar_images: (0..4)
                .map(|i| WebImage {
                    url: format!("https://img.example/{}.jpg", i),
                })
                .collect(),
            ..Default::default()
        });

        let view = ReportView::build(&AnalysisCtx::new(1, "x"), b"", &result, None, None);
        match view.similar_images {
            SectionView::Ok(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].len(), GRID_COLUMNS);
                assert_eq!(rows[1], vec!["https://img.example/3.jpg".to_string()]);
            }
            other => panic!("unexpected section: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports")).unwrap();

        let mut result = eiffel_result();
        result.annotation = Some(Ok(AnnotatedImage {
            image: RgbImage::new(8, 8),
            width: 8,
            height: 8,
            polygons: vec![],
        }));

        let image_bytes = encode_png(&RgbImage::new(8, 8)).unwrap();
        let ctx = AnalysisCtx::new(1, "eiffel");
        let paths = writer.write(&ctx, &image_bytes, &result).await.unwrap();

        assert!(paths.json.exists());
        assert!(paths.html.ends_with("001_eiffel.html"));
        assert!(paths.annotated_png.as_ref().unwrap().exists());
        assert!(paths.map_html.as_ref().unwrap().exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(json["landmarks"]["Ok"][0]["description"], "Eiffel Tower");

        let html = std::fs::read_to_string(&paths.html).unwrap();
        assert!(html.contains("001_eiffel.annotated.png"));
        assert!(html.contains("data:image"));
    }

    #[tokio::test]
    async fn test_write_without_map_or_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        let mut result = eiffel_result();
        result.map = None;

        let paths = writer
            .write(&AnalysisCtx::new(1, "plain"), b"raw", &result)
            .await
            .unwrap();

        assert!(paths.map_html.is_none());
        assert!(paths.annotated_png.is_none());
        assert!(paths.json.ends_with("001_plain.json"));
        assert!(!dir.path().join("001_plain.map.html").exists());
    }
}
