//! Vendor error envelope (`crs:call_exception`).
//!
//! The client decodes the base64 body and parses it as a platform tuple
//! literal, so both the literal and the outer document must match the legacy
//! server exactly, whitespace included.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Namespace URI of the repository protocol.
pub const CRS_NAMESPACE: &str = "http://v8.1c.ru/8.2/crs";

/// Class identifier of the exception object.
pub const CALL_EXCEPTION_CLSID: &str = "3ccb2518-9616-4445-aaa7-20048fead174";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Tuple literal of the exception. `{message}` is substituted twice.
const EXCEPTION_TEMPLATE: &str = "{\n\
\t\t{3ccb2518-9616-4445-aaa7-20048fead174,\"{message}\",\n\
\t\t{9f06d311-1431-4a54-bd6f-fa93c4d4c471,\n\
\t\t{9f06d311-1431-4a54-bd6f-fa93c4d4c471,\"\",\n\
\t\t{00000000-0000-0000-0000-000000000000},\"\"}\n\
\t\t},\"\",\"000000000000000\",00000000-0000-0000-0000-000000000000},17,\n\
\t\t{\"file:////\",0},\"{message}\"}";

/// Render the inner tuple literal for `message`, doubling quotes.
pub fn exception_literal(message: &str) -> String {
    EXCEPTION_TEMPLATE.replace("{message}", &message.replace('"', "\"\""))
}

/// Encode `message` as a complete `crs:call_exception` document.
pub fn encode_error(message: &str) -> String {
    let payload = STANDARD.encode(exception_literal(message));
    format!(
        "{XML_DECLARATION}\n<crs:call_exception xmlns:crs=\"{CRS_NAMESPACE}\" clsid=\"{CALL_EXCEPTION_CLSID}\">{payload}</crs:call_exception>"
    )
}
