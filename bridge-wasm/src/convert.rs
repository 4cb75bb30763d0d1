//! Conversions between bridge HTTP types and `web-sys` objects.

use bridge_traits::http::{HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use js_sys::{try_iter, Array, Uint8Array};
use std::collections::HashMap;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response, ResponseInit};

use crate::error::{WasmError, WasmResult};

/// Statuses whose responses must not carry a body.
const NULL_BODY_STATUSES: [u16; 4] = [101, 204, 205, 304];

fn to_web_headers(headers: &HashMap<String, String>) -> WasmResult<Headers> {
    let web_headers = Headers::new().map_err(|err| WasmError::js("create headers", err))?;
    for (key, value) in headers {
        web_headers
            .set(key, value)
            .map_err(|err| WasmError::js("set header", err))?;
    }
    Ok(web_headers)
}

/// Collect a `Headers` object into a map.
pub fn headers_to_map(headers: &Headers) -> WasmResult<HashMap<String, String>> {
    let iterator = try_iter(&JsValue::from(headers.clone()))
        .map_err(|err| WasmError::js("iterate headers", err))?
        .ok_or_else(|| WasmError::UnexpectedValue("Headers is not iterable".to_string()))?;

    let mut map = HashMap::new();
    for entry in iterator {
        let entry = entry.map_err(|err| WasmError::js("header iteration", err))?;
        let pair = Array::from(&entry);
        if let (Some(key), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
            map.insert(key, value);
        }
    }
    Ok(map)
}

/// Build a `web_sys::Request` from a bridge request.
pub fn to_web_request(
    request: &HttpRequest,
    signal: Option<&web_sys::AbortSignal>,
) -> WasmResult<Request> {
    let init = RequestInit::new();
    init.set_method(request.method.as_str());
    init.set_headers(&to_web_headers(&request.headers)?);

    if let Some(signal) = signal {
        init.set_signal(Some(signal));
    }

    if let Some(body) = &request.body {
        init.set_body(&JsValue::from(Uint8Array::from(body.as_ref())));
    }

    Request::new_with_str_and_init(&request.url, &init)
        .map_err(|err| WasmError::js("build request", err))
}

/// Build a bridge request from an intercepted `web_sys::Request`.
///
/// The body is not read; only bodiless requests are routed through the cache.
pub fn from_web_request(request: &Request) -> WasmResult<HttpRequest> {
    let method = HttpMethod::parse(&request.method()).ok_or_else(|| {
        WasmError::UnexpectedValue(format!("unsupported method {}", request.method()))
    })?;

    let mut converted = HttpRequest::new(method, request.url());
    for (key, value) in headers_to_map(&request.headers())? {
        converted = converted.header(key, value);
    }
    Ok(converted)
}

/// Build a `web_sys::Response` from a bridge response.
pub fn to_web_response(response: &HttpResponse) -> WasmResult<Response> {
    let init = ResponseInit::new();
    init.set_status(response.status);
    init.set_headers(&to_web_headers(&response.headers)?);

    let built = if NULL_BODY_STATUSES.contains(&response.status) {
        Response::new_with_opt_str_and_init(None, &init)
    } else {
        let body = Uint8Array::from(response.body.as_ref());
        Response::new_with_opt_buffer_source_and_init(Some(&*body), &init)
    };
    built.map_err(|err| WasmError::js("build response", err))
}

/// Read a `web_sys::Response` (status, headers, full body) into a bridge response.
pub async fn from_web_response(response: &Response) -> WasmResult<HttpResponse> {
    let promise = response
        .array_buffer()
        .map_err(|err| WasmError::js("response.arrayBuffer", err))?;
    let buffer = JsFuture::from(promise)
        .await
        .map_err(|err| WasmError::js("read response body", err))?;

    let array = Uint8Array::new(&buffer);
    let mut body = vec![0u8; array.length() as usize];
    array.copy_to(&mut body);

    Ok(HttpResponse {
        status: response.status(),
        headers: headers_to_map(&response.headers())?,
        body: Bytes::from(body),
    })
}
