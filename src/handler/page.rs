//! Index page rendering
//!
//! Upload form with drag-and-drop and progress reporting, followed by the
//! list of stored files.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write;

/// Characters escaped when a stored name becomes a single URL path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'\'');

/// Outcome shown above the upload form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Status message passed through the index query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    /// Read `message` and `status` from a query string; no message means no banner
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        let mut message = None;
        let mut kind = BannerKind::Success;

        for (key, value) in form_urlencoded::parse(query?.as_bytes()) {
            match key.as_ref() {
                "message" => message = Some(value.into_owned()),
                "status" if value == "error" => kind = BannerKind::Error,
                _ => {}
            }
        }

        message
            .filter(|m| !m.trim().is_empty())
            .map(|message| Self { kind, message })
    }
}

/// Download link target for a stored name
pub fn download_href(name: &str) -> String {
    format!("/download/{}", utf8_percent_encode(name, PATH_SEGMENT))
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the index page
pub fn render_index(files: &[String], banner: Option<&Banner>) -> String {
    let mut banner_html = String::new();
    if let Some(banner) = banner {
        let class = match banner.kind {
            BannerKind::Success => "success",
            BannerKind::Error => "error",
        };
        let _ = write!(
            banner_html,
            "<div class=\"status {class}\">{}</div>",
            escape_html(&banner.message)
        );
    }

    let mut list_html = String::new();
    if files.is_empty() {
        list_html.push_str("<p class=\"empty\">No files available.</p>");
    } else {
        for name in files {
            let _ = write!(
                list_html,
                "\n            <div class=\"file-item\"><span>{}</span><a href=\"{}\">Download</a></div>",
                escape_html(name),
                escape_html(&download_href(name))
            );
        }
    }

    // Each placeholder is substituted once, inserted text is never rescanned
    let (head, rest) = PAGE_TEMPLATE
        .split_once("{{banner}}")
        .unwrap_or((PAGE_TEMPLATE, ""));
    let (middle, tail) = rest.split_once("{{files}}").unwrap_or((rest, ""));
    format!("{head}{banner_html}{middle}{list_html}{tail}")
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>File Transfer</title>
    <style>
        body {
            font-family: Arial, sans-serif;
            background-color: #000;
            color: #fff;
            margin: 0;
            padding: 20px;
        }
        .container { max-width: 800px; margin: 0 auto; }
        .upload-form, .file-list {
            background-color: #222;
            padding: 20px;
            border-radius: 8px;
            margin-bottom: 20px;
        }
        .file-item {
            display: flex;
            justify-content: space-between;
            align-items: center;
            padding: 10px;
            border-bottom: 1px solid #444;
        }
        .file-item:last-child { border-bottom: none; }
        a { color: #00ff00; text-decoration: none; }
        a:hover { text-decoration: underline; }
        input[type="submit"] {
            background-color: #00ff00;
            color: #000;
            padding: 10px 20px;
            border: none;
            border-radius: 4px;
            cursor: pointer;
        }
        input[type="submit"]:hover { background-color: #00cc00; }
        .status { margin-bottom: 20px; padding: 10px; border-radius: 4px; }
        .success { background-color: #004400; }
        .error { background-color: #440000; }
        .drop-zone {
            height: 150px;
            border: 2px dashed #00ff00;
            border-radius: 8px;
            display: flex;
            align-items: center;
            justify-content: center;
            margin-bottom: 20px;
            color: #00ff00;
            text-align: center;
            cursor: pointer;
        }
        .drop-zone.dragover { border-color: #00cc00; background-color: rgba(0, 255, 0, 0.1); }
        .progress-container { display: none; margin-top: 20px; }
        .progress-bar { height: 20px; background-color: #333; border-radius: 10px; overflow: hidden; }
        .progress { width: 0%; height: 100%; background-color: #00ff00; transition: width 0.3s ease; }
        .progress-text, .upload-status { text-align: center; margin-top: 5px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>File Transfer</h1>
        {{banner}}
        <div class="upload-form">
            <h2>Upload a file</h2>
            <div class="drop-zone" id="dropZone">Drag and drop a file here<br>or click to choose one</div>
            <form id="uploadForm" action="/upload" method="post" enctype="multipart/form-data">
                <input type="file" name="file" required id="fileInput">
                <input type="submit" value="Upload">
            </form>
            <div class="progress-container" id="progressContainer">
                <div class="progress-bar"><div class="progress" id="progressBar"></div></div>
                <div class="progress-text" id="progressText">0%</div>
                <div class="upload-status" id="uploadStatus"></div>
            </div>
        </div>
        <div class="file-list">
            <h2>Available files</h2>
            {{files}}
        </div>
    </div>
    <script>
        const dropZone = document.getElementById('dropZone');
        const fileInput = document.getElementById('fileInput');
        const uploadForm = document.getElementById('uploadForm');
        const progressContainer = document.getElementById('progressContainer');
        const progressBar = document.getElementById('progressBar');
        const progressText = document.getElementById('progressText');
        const uploadStatus = document.getElementById('uploadStatus');

        function uploadFile(file) {
            const formData = new FormData();
            formData.append('file', file);
            progressContainer.style.display = 'block';
            uploadStatus.textContent = 'Starting upload...';

            const xhr = new XMLHttpRequest();
            xhr.upload.onprogress = (e) => {
                if (e.lengthComputable) {
                    const percent = (e.loaded / e.total) * 100;
                    progressBar.style.width = percent + '%';
                    progressText.textContent = percent.toFixed(1) + '%';
                    uploadStatus.textContent = percent < 100 ? 'Uploading...' : 'Processing...';
                }
            };
            xhr.onload = () => {
                if (xhr.status === 200) {
                    window.location.href = '/?status=success&message=' + encodeURIComponent('Uploaded ' + file.name);
                } else {
                    uploadStatus.textContent = 'Upload failed: ' + xhr.responseText;
                }
            };
            xhr.onerror = () => { uploadStatus.textContent = 'Connection error'; };
            xhr.open('POST', '/upload', true);
            xhr.send(formData);
        }

        dropZone.addEventListener('dragover', (e) => { e.preventDefault(); dropZone.classList.add('dragover'); });
        dropZone.addEventListener('dragleave', (e) => { e.preventDefault(); dropZone.classList.remove('dragover'); });
        dropZone.addEventListener('drop', (e) => {
            e.preventDefault();
            dropZone.classList.remove('dragover');
            if (e.dataTransfer.files.length) {
                uploadFile(e.dataTransfer.files[0]);
            }
        });
        dropZone.addEventListener('click', () => fileInput.click());
        fileInput.addEventListener('change', () => {
            if (fileInput.files.length) {
                uploadFile(fileInput.files[0]);
            }
        });
        uploadForm.onsubmit = (e) => {
            e.preventDefault();
            if (fileInput.files.length) {
                uploadFile(fileInput.files[0]);
            }
        };
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing() {
        let html = render_index(&[], None);
        assert!(html.contains("No files available."));
        assert!(!html.contains("class=\"status"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_listing_links() {
        let files = vec!["a.txt".to_string(), "my file.txt".to_string()];
        let html = render_index(&files, None);
        assert!(html.contains("<span>a.txt</span><a href=\"/download/a.txt\">"));
        assert!(html.contains("href=\"/download/my%20file.txt\""));
        assert!(!html.contains("No files available."));
    }

    #[test]
    fn test_names_escaped() {
        let files = vec!["<script>x</script>&\"q\".txt".to_string()];
        let html = render_index(&files, None);
        assert!(html.contains("<span>&lt;script&gt;x&lt;/script&gt;&amp;&quot;q&quot;.txt</span>"));
        assert!(html.contains("href=\"/download/%3Cscript%3Ex%3C%2Fscript%3E&amp;%22q%22.txt\""));
    }

    #[test]
    fn test_banner_from_query() {
        let banner = Banner::from_query(Some("status=error&message=Disk+full%21")).unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "Disk full!");

        let banner = Banner::from_query(Some("message=ok&status=whatever")).unwrap();
        assert_eq!(banner.kind, BannerKind::Success);

        assert!(Banner::from_query(Some("status=success")).is_none());
        assert!(Banner::from_query(Some("message=")).is_none());
        assert!(Banner::from_query(None).is_none());
    }

    #[test]
    fn test_banner_rendered_escaped() {
        let banner = Banner {
            kind: BannerKind::Success,
            message: "<b>done</b>".to_string(),
        };
        let html = render_index(&[], Some(&banner));
        assert!(html.contains("<div class=\"status success\">&lt;b&gt;done&lt;/b&gt;</div>"));
    }
}
