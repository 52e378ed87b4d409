//! End-to-end resolution against a local mock HTTP server.

use std::{
    fs,
    io::{Read, Write},
    net::TcpListener,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use datos_core::{
    Cell, DecodeOptions, FailureStage, Materialization, ResolverOptions, ResourceRef, Resolver,
};
use datos_dl::{ClientConfig, Progress, Transport};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const MUNICIPIOS: &[u8] = include_bytes!("fixtures/municipios.xlsx");
const MUNICIPIOS_XLS: &[u8] = include_bytes!("fixtures/municipios.xls");

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

fn serve(rt: &Runtime, route: &str, template: ResponseTemplate) -> MockServer {
    rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    })
}

/// Answers a single connection with `head` and `body`, then keeps the socket
/// open for `hold` before closing it.
fn raw_server(head: &'static str, body: &'static [u8], hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 2048];
        let _ = stream.read(&mut request);
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(body);
        let _ = stream.flush();
        thread::sleep(hold);
    });

    format!("http://{addr}/data.csv")
}

fn resource(server: &MockServer, route: &str, content_type: &str) -> ResourceRef {
    ResourceRef::new(format!("{}{}", server.uri(), route)).with_content_type(content_type)
}

#[test]
fn test_json_distribution_becomes_table() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw(br#"{"a":[1,2],"b":[3,4]}"#.to_vec(), "application/json"),
    );

    let result = Resolver::default().resolve(&resource(&server, "/data.json", "application/json"), None);
    let table = result.into_table().expect("expected a table");

    assert_eq!(table.columns(), ["a", "b"]);
    assert_eq!(table.row(0).unwrap(), [Cell::Int(1), Cell::Int(3)]);
    assert_eq!(table.row(1).unwrap(), [Cell::Int(2), Cell::Int(4)]);
}

#[test]
fn test_unknown_content_type_returns_raw_bytes() {
    let rt = runtime();
    let body = vec![0u8, 159, 146, 150, 7];
    let server = serve(
        &rt,
        "/f.xyz",
        ResponseTemplate::new(200).set_body_bytes(body.clone()),
    );

    let result = Resolver::default().resolve(
        &resource(&server, "/f.xyz", "application/octet-stream"),
        None,
    );

    assert_eq!(result, Materialization::RawBytes(body));
}

#[test]
fn test_undeclared_content_type_returns_raw_bytes() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/paro.csv",
        ResponseTemplate::new(200).set_body_raw(b"a,b\n1,2\n".to_vec(), "text/csv"),
    );
    let url = format!("{}/paro.csv", server.uri());

    let result = Resolver::default().resolve(&ResourceRef::new(url), None);

    assert_eq!(result, Materialization::RawBytes(b"a,b\n1,2\n".to_vec()));
}

#[test]
fn test_trusted_response_content_type_selects_decoder() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/paro.csv",
        ResponseTemplate::new(200).set_body_raw(b"a,b\n1,2\n".to_vec(), "text/csv"),
    );
    let resolver = Resolver::new(
        Transport::default(),
        ResolverOptions {
            trust_response_content_type: true,
            ..ResolverOptions::default()
        },
    );

    let result = resolver.resolve(&ResourceRef::new(format!("{}/paro.csv", server.uri())), None);

    assert_eq!(result.as_table().unwrap().shape(), (1, 2));
}

#[test]
fn test_windows_1252_csv_is_decoded() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/gastos.csv",
        ResponseTemplate::new(200)
            .set_body_raw(b"concepto;importe\nGasto \x80;12\n".to_vec(), "text/csv"),
    );

    let result = Resolver::default().resolve(&resource(&server, "/gastos.csv", "text/csv"), None);
    let table = result.into_table().expect("expected a table");

    assert_eq!(table.columns(), ["concepto", "importe"]);
    assert_eq!(
        table.row(0).unwrap(),
        [Cell::Text("Gasto €".into()), Cell::Int(12)]
    );
}

#[test]
fn test_explicit_delimiter_option() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/pipes.csv",
        ResponseTemplate::new(200).set_body_raw(b"a|b,c\n1|2,3\n".to_vec(), "text/csv"),
    );
    let resolver = Resolver::new(
        Transport::default(),
        ResolverOptions {
            decode: DecodeOptions {
                csv_delimiter: Some(b'|'),
            },
            ..ResolverOptions::default()
        },
    );

    let table = resolver
        .resolve(&resource(&server, "/pipes.csv", "text/csv"), None)
        .into_table()
        .unwrap();

    assert_eq!(table.columns(), ["a", "b,c"]);
}

#[test]
fn test_xlsx_distribution_becomes_table() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/municipios.xlsx",
        ResponseTemplate::new(200).set_body_raw(MUNICIPIOS.to_vec(), XLSX_MIME),
    );

    let table = Resolver::default()
        .resolve(&resource(&server, "/municipios.xlsx", XLSX_MIME), None)
        .into_table()
        .expect("expected a table");

    assert_eq!(table.columns(), ["municipio", "habitantes", "superficie"]);
    assert_eq!(table.column("habitantes").unwrap(), [&Cell::Int(579076), &Cell::Int(111811)]);
}

#[test]
fn test_xls_distribution_becomes_table() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/municipios.xls",
        ResponseTemplate::new(200).set_body_raw(MUNICIPIOS_XLS.to_vec(), "application/vnd.ms-excel"),
    );

    let table = Resolver::default()
        .resolve(&resource(&server, "/municipios.xls", "application/vnd.ms-excel"), None)
        .into_table()
        .expect("expected a table");

    assert_eq!(table.columns(), ["municipio", "habitantes", "superficie"]);
    assert_eq!(table.row(0).unwrap()[0], Cell::Text("Málaga".into()));
    assert_eq!(table.column("superficie").unwrap(), [&Cell::Float(398.25), &Cell::Float(12.1)]);
}

#[test]
fn test_oversized_content_length_is_download_failure() {
    let url = raw_server(
        "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: 9000000000000000000\r\n\r\n",
        b"abc",
        Duration::ZERO,
    );

    let result = Resolver::default().resolve(&ResourceRef::new(url).with_content_type("text/csv"), None);

    assert_eq!(result.failure().unwrap().stage, FailureStage::Download);
}

#[test]
fn test_stalled_body_times_out() {
    let url = raw_server(
        "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: 100\r\n\r\n",
        b"a,b\n",
        Duration::from_secs(10),
    );
    let transport = Transport::new(ClientConfig {
        timeout: Some(Duration::from_secs(1)),
        ..ClientConfig::default()
    });
    let resolver = Resolver::new(transport, ResolverOptions::default());

    let started = Instant::now();
    let result = resolver.resolve(&ResourceRef::new(url).with_content_type("text/csv"), None);

    assert_eq!(result.failure().unwrap().stage, FailureStage::Download);
    assert!(started.elapsed() < Duration::from_secs(8));
}

#[test]
fn test_save_writes_body_verbatim() {
    let rt = runtime();
    let body: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    let server = serve(
        &rt,
        "/big.xlsx",
        ResponseTemplate::new(200).set_body_bytes(body.clone()),
    );
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nested").join("big.xlsx");

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let resolver = Resolver::default().with_progress(move |p| sink.lock().unwrap().push(p));

    // a decodable content-type is ignored when saving
    let result = resolver.resolve(&resource(&server, "/big.xlsx", XLSX_MIME), Some(&dest));

    assert_eq!(
        result,
        Materialization::SavedToFile {
            path: dest.clone(),
            size: 10_000,
        }
    );
    assert_eq!(fs::read(&dest).unwrap(), body);
    assert_eq!(
        events.lock().unwrap().last(),
        Some(&Progress::Complete {
            total: 10_000
        })
    );
}

#[test]
fn test_save_to_unwritable_path_is_save_failure() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/a.csv",
        ResponseTemplate::new(200).set_body_bytes(b"a\n1\n".to_vec()),
    );
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "").unwrap();

    let result = Resolver::default().resolve(
        &resource(&server, "/a.csv", "text/csv"),
        Some(&blocker.join("a.csv")),
    );

    assert_eq!(result.failure().unwrap().stage, FailureStage::Save);
}

#[test]
fn test_http_error_is_download_failure() {
    let rt = runtime();
    let server = serve(&rt, "/gone.csv", ResponseTemplate::new(404));
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("gone.csv");
    let resolver = Resolver::default();
    let gone = resource(&server, "/gone.csv", "text/csv");

    let buffered = resolver.resolve(&gone, None);
    let saved = resolver.resolve(&gone, Some(&dest));

    for result in [buffered, saved] {
        let failure = result.failure().expect("expected a failure").clone();
        assert_eq!(failure.stage, FailureStage::Download);
        assert!(failure.reason.contains("404"));
    }
    assert!(!dest.exists());
}

#[test]
fn test_connection_refused_is_contained() {
    let resolver = Resolver::default();
    let unreachable = ResourceRef::new("http://127.0.0.1:1/data.csv").with_content_type("text/csv");
    let dir = TempDir::new().unwrap();

    let buffered = resolver.resolve(&unreachable, None);
    let saved = resolver.resolve(&unreachable, Some(&dir.path().join("data.csv")));

    assert_eq!(buffered.failure().unwrap().stage, FailureStage::Download);
    assert_eq!(saved.failure().unwrap().stage, FailureStage::Download);
}

#[test]
fn test_undecodable_body_is_parse_failure() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/broken.json",
        ResponseTemplate::new(200).set_body_raw(b"{not json".to_vec(), "application/json"),
    );

    let result = Resolver::default().resolve(&resource(&server, "/broken.json", "application/json"), None);
    let failure = result.failure().expect("expected a failure");

    assert_eq!(failure.stage, FailureStage::Decode);
    assert!(failure.to_string().starts_with("parse error for "));
}

#[test]
fn test_resolution_is_repeatable() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/data.csv",
        ResponseTemplate::new(200).set_body_raw(b"x,y\n1,2\n3,4\n".to_vec(), "text/csv"),
    );
    let resolver = Resolver::default();
    let data = resource(&server, "/data.csv", "text/csv");

    let first = resolver.resolve(&data, None);
    let second = resolver.resolve(&data, None);

    assert!(first.as_table().is_some());
    assert_eq!(first, second);
}

#[test]
fn test_buffer_is_reused_unless_refetch_enabled() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/data.csv",
        ResponseTemplate::new(200).set_body_raw(b"x\n1\n".to_vec(), "text/csv"),
    );
    let data = resource(&server, "/data.csv", "text/csv");

    Resolver::default().resolve(&data, None);
    let requests = rt.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 1);

    let refetching = Resolver::new(
        Transport::default(),
        ResolverOptions {
            refetch_for_decode: true,
            ..ResolverOptions::default()
        },
    );
    let result = refetching.resolve(&data, None);
    assert!(result.as_table().is_some());

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 3);
}

#[test]
fn test_json_never_refetches() {
    let rt = runtime();
    let server = serve(
        &rt,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw(b"[1,2]".to_vec(), "application/json"),
    );
    let resolver = Resolver::new(
        Transport::default(),
        ResolverOptions {
            refetch_for_decode: true,
            ..ResolverOptions::default()
        },
    );

    resolver.resolve(&resource(&server, "/data.json", "application/json"), None);

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 1);
}
