use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vidhost_rs::models::{validate_email, CreateUploadRequest, Validate};
use vidhost_rs::security::{content_security_policy, get_safe_avatar_url, is_matched_route};
use vidhost_rs::services::WebhookVerifier;

fn bench_avatar_sanitizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("avatar_sanitizer");

    let cases = [
        ("allowed", "https://lh3.googleusercontent.com/a/ACg8ocK=s96-c"),
        ("subdomain", "https://avatars.githubusercontent.com/u/1?v=4"),
        ("http", "http://gravatar.com/avatar/abc"),
        ("lookalike", "https://evilgravatar.com/avatar/abc"),
    ];

    for (name, url) in cases {
        group.bench_with_input(BenchmarkId::new("get_safe_avatar_url", name), url, |b, url| {
            b.iter(|| get_safe_avatar_url(black_box(Some(url))))
        });
    }

    group.finish();
}

fn bench_request_validation(c: &mut Criterion) {
    let request = CreateUploadRequest {
        channel_id: "0b6c7f4e-3a59-4a47-8d0c-3f0d6f3c8a11".to_string(),
        title: "Launch day behind the scenes".to_string(),
        description: Some("A long walk through the studio".repeat(20)),
    };

    c.bench_function("validate_upload_request", |b| {
        b.iter(|| black_box(&request).validate())
    });

    c.bench_function("validate_email", |b| {
        b.iter(|| validate_email(black_box("creator+news@example.co.uk")))
    });
}

fn bench_middleware_helpers(c: &mut Criterion) {
    let paths = [
        "/",
        "/api/videos/upload",
        "/assets/app.js",
        "/images/hero.webp",
        "/api/webhooks/mux",
    ];

    c.bench_function("is_matched_route", |b| {
        b.iter(|| {
            for path in paths {
                black_box(is_matched_route(black_box(path)));
            }
        })
    });

    c.bench_function("content_security_policy", |b| {
        b.iter(|| black_box(content_security_policy().len()))
    });
}

fn bench_webhook_signature(c: &mut Criterion) {
    let verifier = WebhookVerifier::new("whsec-bench", 300);
    let body = br#"{"type":"video.asset.ready","data":{"id":"asset-1","passthrough":"0b6c7f4e-3a59-4a47-8d0c-3f0d6f3c8a11","playback_ids":[{"id":"play-1","policy":"public"}]}}"#;
    let now = 1_700_000_000;
    let header = match verifier.sign(now, body) {
        Ok(header) => header,
        Err(e) => panic!("failed to sign benchmark payload: {}", e),
    };

    c.bench_function("verify_webhook_signature", |b| {
        b.iter(|| verifier.verify(black_box(Some(header.as_str())), black_box(body), now))
    });
}

criterion_group!(
    benches,
    bench_avatar_sanitizer,
    bench_request_validation,
    bench_middleware_helpers,
    bench_webhook_signature
);
criterion_main!(benches);
