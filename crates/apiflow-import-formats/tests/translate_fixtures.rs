use apiflow_core::Id;
use apiflow_import_formats::{FormatDetector, OpenApiTranslator, TranslatorRegistry};
use apiflow_import_types::{
    BodyKind, FileContentType, HttpRequest, ImportFormat, TranslationResult, Translator,
};

const PETSTORE: &str = include_str!("fixtures/petstore_swagger2.json");
const ORDERS: &str = include_str!("fixtures/orders_openapi3.yaml");

fn by_name<'a>(result: &'a TranslationResult, name: &str) -> &'a HttpRequest {
    result
        .http_requests
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no request named {}", name))
}

fn raw_body(result: &TranslationResult, http_id: Id) -> String {
    let body = result
        .body_raw
        .iter()
        .find(|b| b.http_id == http_id)
        .expect("raw body");
    String::from_utf8(body.raw_data.clone()).unwrap()
}

#[test]
fn test_petstore_is_detected_as_openapi() {
    let detection = FormatDetector::new().detect(PETSTORE.as_bytes());
    assert_eq!(detection.format, ImportFormat::OpenApi);
    assert!(detection.confidence > 0.9);
}

#[test]
fn test_petstore_translation() {
    let result = TranslatorRegistry::default()
        .translate(ImportFormat::OpenApi, PETSTORE.as_bytes(), Id::new())
        .unwrap();

    assert_eq!(result.http_requests.len(), 14);
    assert_eq!(result.flows.len(), 1);
    assert_eq!(result.flows[0].name, "Swagger Petstore");
    assert_eq!(result.request_nodes.len(), 14);
    assert_eq!(result.edges.len(), 14);
    assert_eq!(result.domains, vec!["petstore.swagger.io".to_string()]);

    let mut folders: Vec<_> = result
        .files
        .iter()
        .filter(|f| f.content_type == FileContentType::Folder)
        .map(|f| f.name.as_str())
        .collect();
    folders.sort_unstable();
    assert_eq!(folders, vec!["Swagger Petstore", "pet", "store", "user"]);

    let get_pet = by_name(&result, "Find pet by ID");
    assert_eq!(get_pet.method, "GET");
    assert_eq!(get_pet.url, "https://petstore.swagger.io/v2/pet/42");

    let add_pet = by_name(&result, "Add a new pet to the store");
    assert_eq!(add_pet.body_kind, BodyKind::Raw);
    let body = raw_body(&result, add_pet.id);
    assert!(body.contains(r#""name":"doggie""#), "{}", body);
    assert!(result
        .headers
        .iter()
        .any(|h| h.http_id == add_pet.id && h.key == "Content-Type" && h.value == "application/json"));
    assert!(result
        .asserts
        .iter()
        .any(|a| a.http_id == add_pet.id && a.expression == "response.status == 200"));

    // both pet bodies are built from the shared Pet definition
    let update_pet = by_name(&result, "Update an existing pet");
    assert_eq!(update_pet.body_kind, BodyKind::Raw);
    assert_eq!(raw_body(&result, update_pet.id), body);
    let pet: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(pet["status"], "available");
    assert!(pet.get("photoUrls").is_none());

    let form = by_name(&result, "Updates a pet in the store with form data");
    assert_eq!(form.body_kind, BodyKind::UrlEncoded);
    let upload = by_name(&result, "uploads an image");
    assert_eq!(upload.body_kind, BodyKind::Form);

    let delete_order = by_name(&result, "Delete purchase order by ID");
    assert_eq!(
        delete_order.url,
        "https://petstore.swagger.io/v2/store/order/{{orderId}}"
    );

    let find_by_status = by_name(&result, "Finds Pets by status");
    let status = result
        .search_params
        .iter()
        .find(|p| p.http_id == find_by_status.id)
        .unwrap();
    assert_eq!(status.value, "available");
    assert!(status.enabled);

    let find_by_tags = by_name(&result, "Finds Pets by tags");
    let tags = result
        .search_params
        .iter()
        .find(|p| p.http_id == find_by_tags.id)
        .unwrap();
    assert!(!tags.enabled);
}

#[test]
fn test_openapi3_yaml_without_json_body() {
    let detection = FormatDetector::new().detect(ORDERS.as_bytes());
    assert_eq!(detection.format, ImportFormat::OpenApi);

    let result = OpenApiTranslator::new()
        .translate(ORDERS.as_bytes(), Id::new())
        .unwrap();
    assert_eq!(result.http_requests.len(), 2);

    let create = by_name(&result, "Create order");
    assert_eq!(create.url, "https://eu.orders.example.com/api/orders");
    assert_eq!(create.body_kind, BodyKind::UrlEncoded);
    let rows: Vec<_> = result
        .body_urlencoded
        .iter()
        .filter(|r| r.http_id == create.id)
        .map(|r| (r.key.as_str(), r.value.as_str()))
        .collect();
    assert_eq!(rows, vec![("quantity", "3"), ("sku", "A1")]);
    assert!(result
        .asserts
        .iter()
        .any(|a| a.http_id == create.id && a.expression == "response.status == 200"));

    let get = by_name(&result, "getOrder");
    assert_eq!(get.url, "https://eu.orders.example.com/api/orders/ord_1");
}

#[test]
fn test_repeated_translation_is_stable() {
    let translator = OpenApiTranslator::new();
    let shape = |result: &TranslationResult| {
        let mut requests: Vec<_> = result
            .http_requests
            .iter()
            .map(|r| (r.name.clone(), r.method.clone(), r.url.clone(), format!("{:?}", r.body_kind)))
            .collect();
        requests.sort();
        let mut bodies: Vec<_> = result.body_raw.iter().map(|b| b.raw_data.clone()).collect();
        bodies.sort();
        (requests, bodies)
    };

    let workspace = Id::new();
    let first = shape(&translator.translate(ORDERS.as_bytes(), workspace).unwrap());
    for _ in 0..50 {
        let next = translator.translate(ORDERS.as_bytes(), workspace).unwrap();
        assert_eq!(shape(&next), first);
    }
}

#[test]
fn test_detection_across_formats() {
    let detector = FormatDetector::new();
    let cases: [(&str, ImportFormat); 5] = [
        (
            r#"{"log":{"version":"1.2","entries":[]}}"#,
            ImportFormat::Har,
        ),
        (
            r#"{"info":{"name":"c","schema":"https://schema.getpostman.com/json/collection/v2.1.0/collection.json"},"item":[]}"#,
            ImportFormat::Postman,
        ),
        (
            "curl -X GET https://api.example.com/users",
            ImportFormat::Curl,
        ),
        (
            "flows:\n  - name: f\n    steps: []\nrequests: []\n",
            ImportFormat::Yaml,
        ),
        (r#"{"hello":"world"}"#, ImportFormat::Json),
    ];

    for (input, expected) in cases {
        let detection = detector.detect(input.as_bytes());
        assert_eq!(detection.format, expected, "input: {}", input);
    }
    assert_eq!(detector.detect(b"\x00\xff").format, ImportFormat::Unknown);
}
