//! Page module - generates the upload form and result page.

use crate::pipeline::ProcessOutcome;
use crate::template::escape_html;

/// What to show under the upload form.
#[derive(Debug, Clone, Copy)]
pub enum PageContent<'a> {
    /// Bare form
    Form,

    /// Error banner above the form
    Error(&'a str),

    /// Preview and download link for a finished request
    Result(&'a ProcessOutcome),
}

/// Generate the index page.
pub fn render_page(content: PageContent<'_>) -> String {
    let banner = match content {
        PageContent::Error(message) => format!(
            r#"<div class="banner error" role="alert">{}</div>"#,
            escape_html(message)
        ),
        _ => String::new(),
    };

    let result = match content {
        PageContent::Result(outcome) => render_result(outcome),
        _ => String::new(),
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Image Map Email Builder</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            background: #f4f5f7;
            color: #1f2933;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            padding: 32px 16px;
        }}
        main {{ max-width: 880px; margin: 0 auto; }}
        h1 {{ font-size: 24px; margin-bottom: 8px; }}
        p.lead {{ color: #52606d; margin-bottom: 24px; }}
        form, section {{
            background: #fff;
            border-radius: 8px;
            box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
            padding: 24px;
            margin-bottom: 24px;
        }}
        label {{ display: block; font-weight: 600; margin: 16px 0 6px; }}
        label:first-child {{ margin-top: 0; }}
        textarea {{
            width: 100%;
            min-height: 180px;
            font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
            font-size: 13px;
            padding: 8px;
            border: 1px solid #cbd2d9;
            border-radius: 4px;
        }}
        button {{
            margin-top: 16px;
            background: #2563eb;
            color: #fff;
            border: 0;
            border-radius: 4px;
            padding: 10px 20px;
            font-size: 15px;
            cursor: pointer;
        }}
        .banner {{ padding: 12px 16px; border-radius: 6px; margin-bottom: 24px; }}
        .banner.error {{ background: #fde8e8; color: #9b1c1c; border: 1px solid #f8b4b4; }}
        .stats {{ color: #52606d; margin-bottom: 16px; }}
        .download {{
            display: inline-block;
            margin-bottom: 16px;
            color: #2563eb;
            font-weight: 600;
        }}
        iframe {{ width: 100%; height: 640px; border: 1px solid #e4e7eb; border-radius: 4px; }}
    </style>
</head>
<body>
<main>
    <h1>Image Map Email Builder</h1>
    <p class="lead">Upload an image and its HTML image map. Each rectangular area becomes a linked slice of a responsive email.</p>
    {banner}
    <form method="post" action="/process" enctype="multipart/form-data">
        <label for="image">Image (PNG, JPG, JPEG or GIF)</label>
        <input type="file" id="image" name="image" accept=".png,.jpg,.jpeg,.gif" required>
        <label for="map_html">Image map HTML</label>
        <textarea id="map_html" name="map_html" placeholder='&lt;map name="promo"&gt;&#10;  &lt;area shape="rect" coords="0,0,600,200" href="https://example.com" alt="Banner"&gt;&#10;&lt;/map&gt;' required></textarea>
        <button type="submit">Generate email</button>
    </form>
    {result}
</main>
</body>
</html>
"##,
        banner = banner,
        result = result,
    )
}

fn render_result(outcome: &ProcessOutcome) -> String {
    let skipped = if outcome.skipped.is_empty() {
        String::new()
    } else {
        format!(", {} area(s) skipped", outcome.skipped.len())
    };

    format!(
        r#"<section>
        <p class="stats">{count} slice(s) generated{skipped}</p>
        <a class="download" href="/download/{archive}">Download email template (ZIP)</a>
        <iframe title="Email preview" sandbox srcdoc="{preview}"></iframe>
    </section>"#,
        count = outcome.slice_count(),
        skipped = skipped,
        archive = urlencoding::encode(&outcome.archive_name),
        preview = escape_html(&outcome.html),
    )
}
