//! TwiML generation for connecting a call to the media stream endpoint.

/// Track requested from Twilio; bidirectional `<Connect><Stream>` only
/// delivers the caller's leg.
pub const STREAM_TRACK: &str = "inbound_track";

/// Escape a value for use inside a double-quoted XML attribute.
pub fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build a `<Response><Connect><Stream>` document pointing Twilio at
/// `stream_url`, with each pair forwarded as a custom `<Parameter>`.
pub fn connect_stream(stream_url: &str, parameters: &[(&str, &str)]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response><Connect>"#);
    xml.push_str(&format!(
        r#"<Stream url="{}" track="{}">"#,
        xml_escape(stream_url),
        STREAM_TRACK
    ));
    for (name, value) in parameters {
        xml.push_str(&format!(
            r#"<Parameter name="{}" value="{}"/>"#,
            xml_escape(name),
            xml_escape(value)
        ));
    }
    xml.push_str("</Stream></Connect></Response>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("plain"), "plain");
        assert_eq!(
            xml_escape(r#"a<b>&"c"'d'"#),
            "a&lt;b&gt;&amp;&quot;c&quot;&apos;d&apos;"
        );
    }

    #[test]
    fn test_connect_stream_document() {
        let xml = connect_stream(
            "wss://bridge.example.com/media-stream",
            &[("prompt", "Be kind"), ("voice", "verse")],
        );
        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<Response><Connect>"#,
                r#"<Stream url="wss://bridge.example.com/media-stream" track="inbound_track">"#,
                r#"<Parameter name="prompt" value="Be kind"/>"#,
                r#"<Parameter name="voice" value="verse"/>"#,
                r#"</Stream></Connect></Response>"#
            )
        );
    }

    #[test]
    fn test_parameter_values_are_escaped() {
        let xml = connect_stream(
            "wss://bridge.example.com/media-stream",
            &[("prompt", r#"Say "hi" & <wave>"#)],
        );
        assert!(xml.contains(r#"value="Say &quot;hi&quot; &amp; &lt;wave&gt;""#));
        assert!(!xml.contains("<wave>"));
    }
}
