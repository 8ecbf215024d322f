//! cURL command translator
//!
//! Accepts a single `curl` invocation as pasted from a shell or browser
//! dev tools, including line continuations and single, double and ANSI-C
//! (`$'...'`) quoting.

use apiflow_core::WorkspaceId;
use apiflow_import_types::{
    BodyDraft, ImportError, ImportFormat, ImportResult, KeyValueDraft, RequestDraft,
    TranslationBuilder, TranslationResult, Translator,
};
use base64::Engine;
use tracing::debug;

use super::{host_folder_segments, request_name};

const DEFAULT_FLOW_NAME: &str = "cURL Import";

/// Flags whose value is consumed but does not affect the request
const IGNORED_VALUE_FLAGS: [&str; 22] = [
    "-o", "--output", "-m", "--max-time", "--connect-timeout", "-x", "--proxy", "-w",
    "--write-out", "--retry", "-c", "--cookie-jar", "-T", "--upload-file", "--cacert", "--cert",
    "-E", "--key", "--resolve", "-r", "--range", "--limit-rate",
];

fn invalid(reason: impl Into<String>) -> ImportError {
    ImportError::translation(ImportFormat::Curl, reason)
}

pub fn validate(data: &[u8]) -> ImportResult<()> {
    parse(data).map(|_| ())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTranslator;

impl CurlTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Translator for CurlTranslator {
    fn format(&self) -> ImportFormat {
        ImportFormat::Curl
    }

    fn validate(&self, data: &[u8]) -> ImportResult<()> {
        validate(data)
    }

    fn translate(&self, data: &[u8], workspace_id: WorkspaceId) -> ImportResult<TranslationResult> {
        let command = parse(data)?;
        let draft = command.into_draft()?;
        let parsed = url::Url::parse(&draft.url)
            .map_err(|e| invalid(format!("invalid URL {}: {}", draft.url, e)))?;

        let mut builder = TranslationBuilder::new(ImportFormat::Curl, workspace_id);
        let folder = builder.folder_path(&host_folder_segments(&parsed));
        let flow = builder.add_flow(DEFAULT_FLOW_NAME);
        let name = draft.name.clone();
        let created = builder.add_request(draft, folder);
        let node = builder.add_request_node(flow.flow_id, &name, created.http_id, None, (0.0, 150.0));
        builder.add_edge(flow.flow_id, flow.start_node_id, node);

        let result = builder.build(true);
        debug!(url = %parsed, "Translated cURL command");
        Ok(result)
    }
}

/// Everything a curl invocation says about the request
#[derive(Debug, Default)]
struct CurlCommand {
    method: Option<String>,
    url: Option<String>,
    headers: Vec<KeyValueDraft>,
    data: Vec<String>,
    urlencoded_data: Vec<String>,
    form: Vec<KeyValueDraft>,
    get: bool,
    head: bool,
}

impl CurlCommand {
    fn into_draft(self) -> ImportResult<RequestDraft> {
        let raw_url = self.url.ok_or_else(|| invalid("no URL in command"))?;
        let mut url = if raw_url.contains("://") {
            raw_url
        } else {
            format!("http://{}", raw_url)
        };

        let has_body = !self.data.is_empty() || !self.urlencoded_data.is_empty();
        let method = match (&self.method, self.head) {
            (Some(method), _) => method.to_uppercase(),
            (None, true) => "HEAD".to_string(),
            (None, false) if self.get => "GET".to_string(),
            (None, false) if has_body || !self.form.is_empty() => "POST".to_string(),
            _ => "GET".to_string(),
        };

        let mut pieces = self.data;
        pieces.extend(self.urlencoded_data);

        // -G moves the data into the query string
        if self.get && !pieces.is_empty() {
            let separator = if url.contains('?') { '&' } else { '?' };
            url = format!("{}{}{}", url, separator, pieces.join("&"));
            pieces.clear();
        }

        let parsed =
            url::Url::parse(&url).map_err(|e| invalid(format!("invalid URL {}: {}", url, e)))?;
        let mut draft = RequestDraft::new(request_name(&method, &parsed), method, url);
        draft.headers = self.headers;

        if !self.form.is_empty() {
            draft.body = BodyDraft::Form(self.form);
        } else if !pieces.is_empty() {
            let payload = pieces.join("&");
            draft.body = body_for(&draft, payload);
        }

        Ok(draft)
    }
}

/// Urlencoded rows for `k=v&...` payloads sent as a form, raw otherwise
fn body_for(draft: &RequestDraft, payload: String) -> BodyDraft {
    let content_type = draft
        .headers
        .iter()
        .find(|h| h.key.eq_ignore_ascii_case("Content-Type"))
        .map(|h| h.value.to_lowercase());

    let looks_structured = payload.trim_start().starts_with('{') || payload.trim_start().starts_with('[');
    let form_like = !payload.is_empty()
        && payload
            .split('&')
            .all(|pair| pair.contains('=') && !pair.starts_with('='));

    let as_form = match content_type.as_deref() {
        Some(ct) => ct.contains("x-www-form-urlencoded") && form_like,
        None => form_like && !looks_structured,
    };

    if as_form {
        let (_, rows) = apiflow_import_types::split_query(&format!("?{}", payload));
        BodyDraft::UrlEncoded(rows)
    } else {
        BodyDraft::Raw(payload.into_bytes())
    }
}

fn parse(data: &[u8]) -> ImportResult<CurlCommand> {
    let text = std::str::from_utf8(data).map_err(|_| invalid("command is not UTF-8"))?;
    let tokens = tokenize(text)?;
    let mut tokens = tokens.into_iter();

    match tokens.next() {
        Some(first) if first.eq_ignore_ascii_case("curl") => {}
        _ => return Err(invalid("command must start with curl")),
    }

    let mut command = CurlCommand::default();
    while let Some(token) = tokens.next() {
        let (flag, inline) = split_flag(&token);
        let mut value = |name: &str| -> ImportResult<String> {
            match &inline {
                Some(v) => Ok(v.clone()),
                None => tokens
                    .next()
                    .ok_or_else(|| invalid(format!("flag {} expects a value", name))),
            }
        };

        match flag.as_str() {
            "-X" | "--request" => command.method = Some(value(flag.as_str())?),
            "-H" | "--header" => {
                let header = value(flag.as_str())?;
                if let Some((key, val)) = header.split_once(':') {
                    command
                        .headers
                        .push(KeyValueDraft::new(key.trim(), val.trim()));
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-ascii" => {
                command.data.push(value(flag.as_str())?)
            }
            "--data-urlencode" => {
                let raw = value(flag.as_str())?;
                command.urlencoded_data.push(encode_data(&raw));
            }
            "-F" | "--form" | "--form-string" => {
                let field = value(flag.as_str())?;
                let (key, val) = field.split_once('=').unwrap_or((field.as_str(), ""));
                command.form.push(KeyValueDraft::new(key, val));
            }
            "-u" | "--user" => {
                let credentials = value(flag.as_str())?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                command
                    .headers
                    .push(KeyValueDraft::new("Authorization", format!("Basic {}", encoded)));
            }
            "-A" | "--user-agent" => {
                let agent = value(flag.as_str())?;
                command.headers.push(KeyValueDraft::new("User-Agent", agent));
            }
            "-b" | "--cookie" => {
                let cookie = value(flag.as_str())?;
                command.headers.push(KeyValueDraft::new("Cookie", cookie));
            }
            "-e" | "--referer" => {
                let referer = value(flag.as_str())?;
                command.headers.push(KeyValueDraft::new("Referer", referer));
            }
            "--url" => command.url = Some(value(flag.as_str())?),
            "-G" | "--get" => command.get = true,
            "-I" | "--head" => command.head = true,
            f if IGNORED_VALUE_FLAGS.contains(&f) => {
                value(flag.as_str())?;
            }
            f if f.starts_with('-') && f.len() > 1 => {
                // Boolean flags (-s, -L, --compressed, -sSL, ...) are ignored
            }
            _ => {
                if command.url.is_none() {
                    command.url = Some(token.clone());
                }
            }
        }
    }

    if command.url.is_none() {
        return Err(invalid("no URL in command"));
    }
    Ok(command)
}

/// Separate `--flag=value` and `-Xvalue` forms into flag and value
fn split_flag(token: &str) -> (String, Option<String>) {
    if let Some(rest) = token.strip_prefix("--") {
        if let Some((flag, value)) = rest.split_once('=') {
            return (format!("--{}", flag), Some(value.to_string()));
        }
        return (token.to_string(), None);
    }

    const ATTACHED: [char; 8] = ['X', 'H', 'd', 'u', 'A', 'b', 'e', 'F'];
    let mut chars = token.chars();
    if chars.next() == Some('-') {
        if let Some(flag) = chars.next() {
            let rest: String = chars.collect();
            if ATTACHED.contains(&flag) && !rest.is_empty() {
                return (format!("-{}", flag), Some(rest));
            }
        }
    }
    (token.to_string(), None)
}

/// `--data-urlencode` forms: `content`, `=content`, `name=content`
fn encode_data(raw: &str) -> String {
    match raw.split_once('=') {
        Some(("", content)) => urlencoding::encode(content).into_owned(),
        Some((name, content)) => format!("{}={}", name, urlencoding::encode(content)),
        None => urlencoding::encode(raw).into_owned(),
    }
}

/// Shell-style word splitting
fn tokenize(input: &str) -> ImportResult<Vec<String>> {
    // Line continuations from bash and Windows cmd
    let input = input
        .replace("\\\r\n", " ")
        .replace("\\\n", " ")
        .replace("^\r\n", " ")
        .replace("^\n", " ");

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(invalid("unterminated single quote")),
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\' | '$' | '`')) => current.push(escaped),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(invalid("unterminated double quote")),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(invalid("unterminated double quote")),
                    }
                }
            }
            '$' if chars.peek() == Some(&'\'') => {
                chars.next();
                in_token = true;
                read_ansi_c(&mut chars, &mut current)?;
            }
            '\\' => {
                in_token = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn read_ansi_c(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
) -> ImportResult<()> {
    loop {
        match chars.next() {
            Some('\'') => return Ok(()),
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some('x') => {
                    let hex: String = (0..2).filter_map(|_| chars.next_if(|c| c.is_ascii_hexdigit())).collect();
                    match u8::from_str_radix(&hex, 16) {
                        Ok(byte) => out.push(byte as char),
                        Err(_) => out.push_str("\\x"),
                    }
                }
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(invalid("unterminated $'...' string")),
            },
            Some(ch) => out.push(ch),
            None => return Err(invalid("unterminated $'...' string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiflow_core::Id;
    use apiflow_import_types::BodyKind;

    fn translate(command: &str) -> TranslationResult {
        CurlTranslator::new()
            .translate(command.as_bytes(), Id::new())
            .unwrap()
    }

    #[test]
    fn test_tokenizer_quoting() {
        let tokens = tokenize(r#"curl 'a b' "c \"d\"" $'e\nf' g\ h"#).unwrap();
        assert_eq!(tokens, vec!["curl", "a b", "c \"d\"", "e\nf", "g h"]);
    }

    #[test]
    fn test_line_continuations() {
        let tokens = tokenize("curl \\\n  -X POST \\\n  https://x.dev").unwrap();
        assert_eq!(tokens, vec!["curl", "-X", "POST", "https://x.dev"]);
    }

    #[test]
    fn test_json_post() {
        let result = translate(
            r#"curl -X POST https://api.example.com/users -H 'Content-Type: application/json' -d '{"name":"bob"}'"#,
        );
        let request = &result.http_requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://api.example.com/users");
        assert_eq!(request.body_kind, BodyKind::Raw);
        assert_eq!(result.body_raw[0].raw_data, br#"{"name":"bob"}"#.to_vec());
        assert_eq!(result.headers[0].key, "Content-Type");
        assert_eq!(result.domains, vec!["api.example.com".to_string()]);
        assert_eq!(result.edges.len(), 1);
    }

    #[test]
    fn test_data_implies_post_and_form_body() {
        let result = translate("curl https://example.com/login -d user=bob -d 'pass=a b'");
        let request = &result.http_requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.body_kind, BodyKind::UrlEncoded);
        assert_eq!(result.body_urlencoded.len(), 2);
        assert_eq!(result.body_urlencoded[1].value, "a b");
    }

    #[test]
    fn test_auth_agent_cookie_and_ignored_flags() {
        let result = translate(
            "curl -sSL --compressed -o out.json -u user:pw -A agent/1 -b 'a=1' -e https://ref.dev --max-time=5 https://example.com/x",
        );
        let header = |key: &str| {
            result
                .headers
                .iter()
                .find(|h| h.key == key)
                .map(|h| h.value.clone())
        };
        assert_eq!(header("Authorization"), Some("Basic dXNlcjpwdw==".to_string()));
        assert_eq!(header("User-Agent"), Some("agent/1".to_string()));
        assert_eq!(header("Cookie"), Some("a=1".to_string()));
        assert_eq!(header("Referer"), Some("https://ref.dev".to_string()));
        assert_eq!(result.http_requests[0].url, "https://example.com/x");
        assert_eq!(result.http_requests[0].method, "GET");
    }

    #[test]
    fn test_get_flag_moves_data_to_query() {
        let result = translate("curl -G https://example.com/search --data-urlencode 'q=hello world'");
        assert_eq!(result.http_requests[0].method, "GET");
        assert_eq!(result.http_requests[0].url, "https://example.com/search");
        assert_eq!(result.search_params[0].value, "hello world");
    }

    #[test]
    fn test_head_attached_flags_and_missing_scheme() {
        let result = translate("curl -I -HAccept:text/plain example.com/status");
        assert_eq!(result.http_requests[0].method, "HEAD");
        assert_eq!(result.http_requests[0].url, "http://example.com/status");
        assert_eq!(result.headers[0].value, "text/plain");
    }

    #[test]
    fn test_multipart_form() {
        let result = translate("curl -F name=bob -F file=@photo.png https://example.com/upload");
        assert_eq!(result.http_requests[0].method, "POST");
        assert_eq!(result.http_requests[0].body_kind, BodyKind::Form);
        assert_eq!(result.body_forms[1].value, "@photo.png");
    }

    #[test]
    fn test_rejects_non_curl_input() {
        assert!(validate(b"wget https://example.com").is_err());
        assert!(validate(b"curl -s").is_err());
        assert!(validate(b"curl 'unterminated").is_err());
    }
}
