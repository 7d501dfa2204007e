//! Minification for the published document.
//!
//! Uses oxc for JavaScript, lightningcss for CSS and minify-html for the
//! final whitespace pass. Unlike a best-effort asset pipeline, every failure
//! here is reported: a document that cannot be minified is not published.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// A JavaScript source that failed to parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsMinifyError {
    pub error_count: usize,
    pub message: String,
}

/// Minify JavaScript source code.
pub fn minify_js(source: &str) -> Result<String, JsMinifyError> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return Err(JsMinifyError {
            error_count: ret.errors.len(),
            message: ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        });
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Result<String, String> {
    let mut stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| e.to_string())?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

/// Collapse whitespace and drop comments from a complete HTML document.
///
/// Inline scripts and styles are expected to be minified already and are
/// left alone.
pub fn minify_html(html: &str) -> Result<String, String> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = false;
    cfg.minify_js = false;
    let minified = minify_html::minify(html.as_bytes(), &cfg);
    if minified.is_empty() && !html.trim().is_empty() {
        return Err("minifier produced an empty document".to_string());
    }
    String::from_utf8(minified).map_err(|e| e.to_string())
}
