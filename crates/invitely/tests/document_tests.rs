use std::sync::Arc;

use boa_engine::{Context, Source};
use invitely::value::lookup_str;
use invitely::{AssetEmbedder, InMemoryAssetSource, ThemeId, assemble, read_payload, render};
use serde_json::{Value, json};

fn png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(16, 16, image::Rgba([10, 20, 30, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// A bare JS engine with just enough of a DOM for a bundle to load
fn load_bundle(bundle: &str) -> Context {
    let mut context = Context::default();
    context
        .eval(Source::from_bytes(
            r#"globalThis.document = { readyState: "loading", addEventListener() {} };"#,
        ))
        .unwrap();
    context.eval(Source::from_bytes(bundle)).unwrap();
    context
}

fn eval_json(context: &mut Context, expression: &str) -> Value {
    let script = format!("JSON.stringify(({expression}) ?? null)");
    let value = context.eval(Source::from_bytes(&script)).unwrap();
    let text = value.to_string(context).unwrap().to_std_string_escaped();
    serde_json::from_str(&text).unwrap()
}

fn edge_case_configs() -> Vec<Value> {
    vec![
        json!({ "text": { "couple": { "brideFullName": "Ayu", "groomFullName": "Budi" } } }),
        json!({ "text": { "couple": { "brideName": "  Sari  ", "groom": "Dimas" } } }),
        json!({
            "text": {
                "couple": {
                    "brideFullName": "\u{feff} Ayu \u{feff}",
                    "groomFullName": "\u{85}Budi\u{85}"
                },
                "event": { "receptionLocation": "\u{a0}\u{3000}Bandung\u{2028}" }
            }
        }),
        json!({
            "text": {
                "couple": { "brideFullName": 42, "brideName": ["Sari"], "bride": "Sari" },
                "event": {
                    "receptionDate": true,
                    "akadDate": null,
                    "date": { "day": 14 },
                    "akadLocation": 1.5
                }
            }
        }),
        json!({
            "text": {
                "couple": { "brideFullName": "   ", "brideName": "\u{3000}\u{2028}", "groomFullName": "" },
                "opening": { "paragraph1": "\t\n" },
                "closing": { "paragraph1": "Thank you" }
            }
        }),
        json!({ "text": [{ "couple": { "brideFullName": "Ayu" } }] }),
        json!({ "text": "Ayu" }),
        json!({ "text": { "event": { "akadDate": "2026-02-14", "akadLocation": "Bandung <Hall>" } } }),
        json!({}),
    ]
}

#[test]
fn test_hydration_props_match_server_props() {
    for theme in ThemeId::ALL {
        for config in edge_case_configs() {
            let output = render(theme.as_str(), config.clone(), "ayu-budi").unwrap();
            let document = assemble(&output).unwrap();
            let payload = read_payload(&document).expect("document carries a payload");
            assert_eq!(payload.theme, theme);

            let mut context = load_bundle(&output.client_bundle);
            assert_eq!(eval_json(&mut context, "invitely.theme"), json!(theme.as_str()));

            let client_props = eval_json(
                &mut context,
                &format!(
                    "invitely.deriveRenderProps({}, {})",
                    serde_json::to_string(&payload.data).unwrap(),
                    serde_json::to_string(&payload.slug).unwrap()
                ),
            );
            assert_eq!(
                client_props,
                serde_json::to_value(&output.props).unwrap(),
                "{theme:?} {config}"
            );
        }
    }
}

#[test]
fn test_client_lookup_matches_server_lookup() {
    let config = json!({
        "gallery": ["  a  ", 5, "", "\u{feff}", "\u{85}"],
        "text": { "0": " zero " },
        "nested": [["x"], { "name": "y" }]
    });
    let paths = [
        "gallery.0",
        "gallery.00",
        "gallery.1",
        "gallery.2",
        "gallery.3",
        "gallery.4",
        "gallery.5",
        "gallery.-1",
        "gallery.1e0",
        "gallery. 0",
        "gallery.length",
        "gallery.0.length",
        "gallery.99999999999999999999",
        "text.0",
        "nested.0.0",
        "nested.1.name",
        "nested.1.0",
        "gallery",
        "",
    ];

    let output = render("floral", json!({}), "s").unwrap();
    let mut context = load_bundle(&output.client_bundle);
    let config_js = serde_json::to_string(&config).unwrap();

    for path in paths {
        let client = eval_json(
            &mut context,
            &format!(
                "invitely.lookupStr({config_js}, {})",
                serde_json::to_string(path).unwrap()
            ),
        );
        assert_eq!(client, json!(lookup_str(&config, path)), "{path:?}");
    }
}

#[test]
fn test_document_is_self_contained() {
    let output = render("floral", json!({}), "s").unwrap();
    let document = assemble(&output).unwrap();

    assert!(document.contains("<style>"));
    assert!(!document.contains("<script src"));
    assert!(document.matches("__INVITATION_DATA__").count() >= 2);
}

#[tokio::test]
async fn test_embedded_images_reach_the_document() {
    let source = InMemoryAssetSource::new().with_file("images/bride.png", png());
    let embedder = AssetEmbedder::new(Arc::new(source));

    let config = embedder
        .embed(json!({
            "text": { "couple": { "brideFullName": "Ayu" } },
            "images": { "bride": "/images/bride.png", "groom": "/images/missing.png" }
        }))
        .await;

    let output = render("classic", config, "ayu").unwrap();
    let document = assemble(&output).unwrap();

    assert!(document.contains("data:image/"));
    assert!(document.contains("/images/missing.png"));
    assert!(!document.contains("/images/bride.png"));
}
