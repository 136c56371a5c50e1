// src/reload/client.rs

//! Browser side of live reload and its injection into served HTML.

/// URL the dev server answers with [`client_script`].
pub const CLIENT_SCRIPT_PATH: &str = "/__assetpipe/reload.js";

/// Reload client. `__PORT__` is replaced with the WebSocket port.
const CLIENT_JS: &str = r#"(function () {
  var isCss = function (p) { return /\.css(\?|$)/i.test(p); };
  var injectStyles = function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var href = links[i].href.replace(/[?&]__ap=\d+/, '');
      links[i].href = href + (href.indexOf('?') < 0 ? '?' : '&') + '__ap=' + Date.now();
    }
  };
  var connect = function () {
    var ws = new WebSocket('ws://' + location.hostname + ':__PORT__');
    ws.onmessage = function (event) {
      var msg = JSON.parse(event.data);
      if (msg.type === 'inject_styles') { injectStyles(); return; }
      if (msg.type === 'changed' && msg.paths.length && msg.paths.every(isCss)) { injectStyles(); return; }
      location.reload();
    };
    ws.onclose = function () { setTimeout(connect, 1000); };
  };
  connect();
})();
"#;

pub fn client_script(ws_port: u16) -> String {
    CLIENT_JS.replace("__PORT__", &ws_port.to_string())
}

/// Insert the client `<script>` tag before the last `</body>`, or append it
/// when the document has none.
pub fn inject_client_tag(content: &[u8]) -> Vec<u8> {
    let tag = format!(r#"<script src="{CLIENT_SCRIPT_PATH}"></script>"#);
    let tag = tag.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + tag.len());
    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(tag);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(tag);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_goes_before_closing_body() {
        let html = b"<html><BODY><p>x</p></BODY></html>";
        let out = String::from_utf8(inject_client_tag(html)).unwrap();
        assert!(out.contains(r#"<script src="/__assetpipe/reload.js"></script></BODY>"#));
    }

    #[test]
    fn tag_is_appended_without_body() {
        let out = String::from_utf8(inject_client_tag(b"<p>fragment</p>")).unwrap();
        assert!(out.starts_with("<p>fragment</p><script"));
    }

    #[test]
    fn script_carries_port() {
        assert!(client_script(35800).contains(":35800"));
    }
}
