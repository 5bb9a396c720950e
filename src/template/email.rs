//! Responsive email document assembled from published slices.
//!
//! Slices are stacked vertically in a 600px container and scale down to the
//! viewport on narrow screens. Each slice is wrapped in its region's link.

use serde::Serialize;

use super::escape_html;
use crate::map::Region;

/// One published slice as it appears in the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSlice {
    /// Public URL of the slice image
    pub url: String,
    pub href: String,
    pub alt: String,
    pub title: String,
}

impl EmailSlice {
    /// Pair a region's link metadata with the URL its slice was published at.
    pub fn from_region(region: &Region, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            href: region.href.clone(),
            alt: region.alt.clone(),
            title: region.title.clone(),
        }
    }
}

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0, user-scalable=yes">
<meta http-equiv="X-UA-Compatible" content="IE=edge">
<title>Responsive Email Template</title>
<style>
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  margin: 0; padding: 0;
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
  background-color: #f4f4f4;
  -webkit-text-size-adjust: 100%; -ms-text-size-adjust: 100%;
}
.email-container {
  width: 100%; max-width: 600px; margin: 0 auto;
  background: #ffffff; box-shadow: 0 2px 10px rgba(0, 0, 0, 0.1);
}
.image-section { display: block; width: 100%; border: 0; outline: none; text-decoration: none; }
.image-section img {
  display: block; width: 100%; max-width: 100%; height: auto;
  border: 0; outline: none; -ms-interpolation-mode: bicubic;
}
@media (max-width: 599px) {
  .email-container { width: 100% !important; max-width: 100% !important; margin: 0 !important; box-shadow: none !important; }
  .image-section img { width: 100% !important; height: auto !important; }
}
@media (min-width: 600px) and (max-width: 768px) {
  .email-container { width: 95% !important; max-width: 600px !important; }
}
@media (min-width: 769px) {
  .email-container { width: 600px !important; max-width: 600px !important; }
}
@media (prefers-color-scheme: dark) {
  body { background-color: #1a1a1a; }
  .email-container { background-color: #2d2d2d; }
}
@media print {
  .email-container { width: 100% !important; max-width: none !important; box-shadow: none !important; }
}
</style>
</head>
<body>
  <div class="email-container">"#;

const TAIL: &str = r#"
  </div>
</body>
</html>
"#;

/// Render the complete email document for `slices`, in order.
///
/// Every image after the first is lazily loaded. Slices with an empty alt
/// text get `Image slice {n}` (1-based) so every image stays labelled.
pub fn render_email(slices: &[EmailSlice]) -> String {
    let mut html = String::with_capacity(HEAD.len() + TAIL.len() + slices.len() * 320);
    html.push_str(HEAD);

    for (i, slice) in slices.iter().enumerate() {
        let alt = if slice.alt.is_empty() {
            format!("Image slice {}", i + 1)
        } else {
            slice.alt.clone()
        };
        let loading = if i > 0 { r#" loading="lazy""# } else { "" };

        html.push_str(&format!(
            r#"
    <a href="{href}" class="image-section" target="_blank" rel="noopener noreferrer">
      <img src="{src}" alt="{alt}" title="{title}"{loading} style="width:100%;height:auto;display:block;border:0;">
    </a>"#,
            href = escape_html(&slice.href),
            src = escape_html(&slice.url),
            alt = escape_html(&alt),
            title = escape_html(&slice.title),
            loading = loading,
        ));
    }

    html.push_str(TAIL);
    html
}
