//! Smoke run: build the Parent/Child pair, encode, dump, parse back.
use serde_json::json;
use typehint_json::{encode, parse_text, resolve_type, RecordType, TypeDecl, Value};

fn main() {
    let child = RecordType::builder("Child")
        .field("x", TypeDecl::union([TypeDecl::int(), TypeDecl::str()]))
        .field_default("y", TypeDecl::int(), Value::Int(4))
        .build();
    let parent = RecordType::builder("Parent")
        .field("a", TypeDecl::int())
        .field("c", TypeDecl::record(&child))
        .build();
    let descriptor = resolve_type(&TypeDecl::record(&parent));

    let samples = [
        json!({"a": 2, "c": {"x": "meow"}}),
        json!({"a": 3, "c": {"x": 7, "y": 1, "ignored": true}}),
        json!({"a": 4, "c": {"y": 1}}),
        json!({"a": "four", "c": {"x": 1}}),
    ];
    for sample in &samples {
        match parse_text(&sample.to_string(), &descriptor) {
            Ok(value) => {
                eprintln!("✅ {value}");
                let text = encode(&value, false).to_string();
                match parse_text(&text, &descriptor) {
                    Ok(again) if again == value => eprintln!("   round trip ok: {text}"),
                    Ok(again) => eprintln!("❌ round trip changed the value: {again}"),
                    Err(error) => eprintln!("❌ round trip failed: {error}"),
                }
            }
            Err(error) => eprintln!("❌ {sample}: {error}"),
        }
    }
}
