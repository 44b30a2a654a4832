//! Fetch integration tests over file and HTTP remotes

mod common;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use common::{TestEnv, remote_at, store_with};
use graphpack::bundle::{Bundle, pack};
use graphpack::cache::RepositoryIndex;
use graphpack::domain::BundleKey;
use graphpack::error::GraphpackError;
use graphpack::operations::{Deployer, Fetcher};
use graphpack::remote::http::HttpAccessor;
use graphpack::remote::{Accessor, RemoteClient};

fn index() -> RepositoryIndex {
    RepositoryIndex::new(Duration::from_secs(60))
}

/// Publish ex/base@1 and ex/app@1 (depending on ex/base) to the file remote
fn publish_pair(env: &TestEnv) {
    let origin = env.other_cache("origin");
    let store = store_with(&[
        ("http://example.org/base", "http://example.org/s1"),
        ("http://example.org/app", "http://example.org/s2"),
    ]);
    env.install(&origin, "id: ex/base\nincludes: ['http://example.org/base']\n", &store);
    env.install(
        &origin,
        "id: ex/app\nincludes: ['http://example.org/app']\ndependencies: [ex/base]\n",
        &store,
    );

    let remotes = [env.file_remote("origin")];
    let deployer = Deployer::new(&origin, &remotes);
    for id in ["ex/base", "ex/app"] {
        assert!(deployer.deploy(id, None).unwrap().all_succeeded());
    }
}

#[test]
fn test_fetch_pulls_dependencies_from_file_remote() {
    let env = TestEnv::new();
    publish_pair(&env);

    let cache = env.cache();
    let remotes = [env.file_remote("origin")];
    let report = Fetcher::new(&cache, &index(), &remotes)
        .fetch("ex/app", None)
        .unwrap();

    assert_eq!(
        report.installed,
        vec![BundleKey::new("ex/base", 1), BundleKey::new("ex/app", 1)]
    );

    let bundle = Bundle::open(&cache, "ex/app", None).unwrap();
    let store = bundle.load().unwrap();
    let contexts: Vec<&str> = store.quads().map(|(ctx, _)| ctx).collect();
    assert_eq!(
        contexts,
        vec!["http://example.org/app", "http://example.org/base"]
    );
}

#[test]
fn test_fetch_falls_back_to_next_remote() {
    let env = TestEnv::new();
    publish_pair(&env);

    let cache = env.cache();
    let remotes = [
        remote_at("broken", &env.temp.path().join("missing")),
        env.file_remote("origin"),
    ];
    let report = Fetcher::new(&cache, &index(), &remotes)
        .fetch("ex/base", Some(1))
        .unwrap();
    assert_eq!(report.bundle.key, BundleKey::new("ex/base", 1));
}

#[test]
fn test_fetch_unknown_bundle() {
    let env = TestEnv::new();
    publish_pair(&env);
    let cache = env.cache();
    let remotes = [env.file_remote("origin")];

    let err = Fetcher::new(&cache, &index(), &remotes)
        .fetch("ex/missing", None)
        .unwrap_err();
    assert!(matches!(err, GraphpackError::BundleNotFound { .. }));
}

#[test]
fn test_corrupt_archive_on_remote_is_not_installed() {
    let env = TestEnv::new();
    publish_pair(&env);

    let path = graphpack::remote::file::FileAccessor::archive_path(&env.remote_root, "ex/base", 1);
    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    std::fs::write(&path, &bytes).unwrap();

    let cache = env.cache();
    let remotes = [env.file_remote("origin")];
    assert!(
        Fetcher::new(&cache, &index(), &remotes)
            .fetch("ex/base", Some(1))
            .is_err()
    );
    assert!(!cache.contains("ex/base", 1));
}

/// Serve fixed bodies by request path until the listener is dropped
fn serve(routes: HashMap<String, Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let head = String::from_utf8_lossy(&buf).to_string();
            let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
            let (status, body) = match routes.get(&path) {
                Some(body) => ("200 OK", body.clone()),
                None => ("404 Not Found", Vec::new()),
            };
            let _ = write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(&body);
        }
    });
    base
}

#[test]
fn test_fetch_over_http() {
    let env = TestEnv::new();
    let origin = env.other_cache("origin");
    let store = store_with(&[("http://example.org/ctx", "http://example.org/s")]);
    let report = env.install(&origin, "id: ex/a\nincludes: ['http://example.org/ctx']\n", &store);
    let archive = pack(&report.bundle.path).unwrap();

    let mut routes = HashMap::new();
    routes.insert(
        "/index.json".to_string(),
        br#"{"ex/a": {"1": "bundles/ex-a-1.tar.gz", "draft": "ignored"}}"#.to_vec(),
    );
    routes.insert("/bundles/ex-a-1.tar.gz".to_string(), archive);
    let base = serve(routes);

    let remote = RemoteClient::with_accessors(
        "web",
        vec![Box::new(HttpAccessor::new(format!("{base}/index.json"), None).unwrap())
            as Box<dyn Accessor>],
        Duration::from_secs(10),
    );
    let cache = env.cache();
    let fetched = Fetcher::new(&cache, &index(), std::slice::from_ref(&remote))
        .fetch("ex/a", None)
        .unwrap();

    assert_eq!(fetched.installed, vec![BundleKey::new("ex/a", 1)]);
    assert_eq!(
        fetched.bundle.manifest.content_hash,
        report.bundle.manifest.content_hash
    );
}
