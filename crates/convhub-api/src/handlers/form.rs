//! Embedded upload form.

use std::fmt::Write;

use axum::extract::State;
use axum::response::Html;

use convhub_convert::ConversionInfo;

use crate::state::AppState;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>ConvHub</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 3rem auto; }
label { display: block; margin: 1rem 0 0.25rem; }
small { color: #666; }
</style>
</head>
<body>
<h1>File conversion</h1>
<form method="post" action="/" enctype="multipart/form-data">
<label for="files">Files</label>
<input id="files" type="file" name="files" multiple required>
<label for="conversion_type">Conversion</label>
<select id="conversion_type" name="conversion_type" required>
"#;

const PAGE_TAIL: &str = r#"</select>
<p><button type="submit">Convert</button></p>
</form>
<p><small>Several outputs are returned as converted_files.zip.</small></p>
</body>
</html>
"#;

/// GET /
pub async fn upload_form(State(state): State<AppState>) -> Html<String> {
    Html(render(&state.registry.describe()))
}

fn render(conversions: &[ConversionInfo]) -> String {
    let mut page = String::from(PAGE_HEAD);
    for info in conversions {
        let _ = writeln!(
            page,
            r#"<option value="{}">{} (.{} &rarr; .{})</option>"#,
            info.id,
            info.label,
            info.accepted_extensions.join(", ."),
            info.output_extension
        );
    }
    page.push_str(PAGE_TAIL);
    page
}
