//! End-to-end rendering of pandoc documents against a fake toolchain.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tkz_config::{ToolCommand, ToolchainConfig};
use tkz_diagrams::{CommandRunner, TikzProcessor, ToolOutput};
use tkz_pandoc::{Document, TargetFormat};

/// Toolchain standing in for `pdflatex` and `pdftocairo`.
///
/// The typesetter fails with exit code 1 when the wrapper contains `\fail`.
/// Every invocation is recorded in the shared call log.
#[derive(Clone, Default)]
struct FakeToolchain {
    calls: Rc<RefCell<Vec<String>>>,
}

impl FakeToolchain {
    fn count(&self, program: &str) -> usize {
        self.calls.borrow().iter().filter(|p| *p == program).count()
    }

    fn total(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl CommandRunner for FakeToolchain {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/bin").join(program))
    }

    fn run(
        &self,
        program: &str,
        args: &[String],
        _cwd: &Path,
        _timeout: Duration,
    ) -> io::Result<ToolOutput> {
        self.calls.borrow_mut().push(program.to_owned());
        match program {
            "tex" => {
                let outdir = Path::new(&args[0]);
                let stem = &args[1];
                let wrapper = fs::read_to_string(&args[2])?;
                if wrapper.contains("\\fail") {
                    fs::write(
                        outdir.join(format!("{stem}.log")),
                        "! Undefined control sequence.\nl.5 \\fail",
                    )?;
                    return Ok(ToolOutput {
                        code: Some(1),
                        ..ToolOutput::default()
                    });
                }
                fs::write(
                    outdir.join(format!("{stem}.pdf")),
                    format!("%PDF-1.5\n{wrapper}"),
                )?;
            }
            "conv" => {
                let pdf = fs::read(&args[0])?;
                fs::write(
                    &args[1],
                    format!(
                        "<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"20pt\"><desc>{}</desc></svg>\n",
                        pdf.len()
                    ),
                )?;
            }
            _ => return Err(io::Error::from(io::ErrorKind::NotFound)),
        }
        Ok(ToolOutput {
            code: Some(0),
            ..ToolOutput::default()
        })
    }
}

fn toolchain() -> ToolchainConfig {
    ToolchainConfig {
        typesetter: ToolCommand::new("tex", ["{outdir}", "{stem}", "{input}"]),
        converter: ToolCommand::new("conv", ["{input}", "{output}"]),
        timeout: Duration::from_secs(5),
    }
}

fn processor(fake: &FakeToolchain, target: &str, base: &Path) -> TikzProcessor<FakeToolchain> {
    TikzProcessor::with_runner(fake.clone(), toolchain(), TargetFormat::parse(target))
        .base_dir(base)
}

fn code_block(classes: &[&str], attributes: &[(&str, &str)], text: &str) -> Value {
    json!({"t": "CodeBlock", "c": [["", classes, attributes], text]})
}

fn document(meta: Value, blocks: Vec<Value>) -> Document {
    Document::from_value(json!({
        "pandoc-api-version": [1, 23, 1],
        "meta": meta,
        "blocks": blocks,
    }))
    .unwrap()
}

fn meta_string(value: &str) -> Value {
    json!({"t": "MetaString", "c": value})
}

fn tikz_meta(entries: &[(&str, Value)]) -> Value {
    let map: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect();
    json!({"tikz": {"t": "MetaMap", "c": map}})
}

/// Image element inside a `Para [Image]` block.
fn image(block: &Value) -> &Value {
    assert_eq!(block["t"], "Para", "expected an image paragraph: {block}");
    &block["c"][0]
}

fn image_url(block: &Value) -> &str {
    image(block)["c"][2][0].as_str().unwrap()
}

const NODE: &str = "\\node (A) at (0,0) {A};";

#[test]
fn test_inline_svg_for_html() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![code_block(
            &["tikz"],
            &[("format", "svg"), ("embed-mode", "inline")],
            NODE,
        )],
    );

    let changed = processor(&fake, "html", base.path()).process_document(&mut doc);

    assert_eq!(changed, 1);
    assert_eq!(doc.block_count(), 1);
    let url = image_url(&doc.blocks()[0]);
    let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
    let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
    assert!(svg.contains("<svg"));
    assert_eq!(fake.count("tex"), 1);
    assert_eq!(fake.count("conv"), 1);
}

#[test]
fn test_link_writes_image_file() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![code_block(
            &["tikz"],
            &[
                ("format", "svg"),
                ("embed-mode", "link"),
                ("folder", "./images"),
                ("filename", "ex"),
            ],
            NODE,
        )],
    );

    processor(&fake, "html", base.path()).process_document(&mut doc);

    assert_eq!(image_url(&doc.blocks()[0]), "./images/ex.svg");
    let written = fs::read_to_string(base.path().join("images/ex.svg")).unwrap();
    assert!(written.contains("<svg"));
}

#[test]
fn test_latex_target_links_pdf() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![code_block(&["tikz"], &[("embed-mode", "inline")], NODE)],
    );

    processor(&fake, "latex", base.path()).process_document(&mut doc);

    assert_eq!(image_url(&doc.blocks()[0]), "images/tikz-image-1.pdf");
    assert!(base.path().join("images/tikz-image-1.pdf").is_file());
    assert_eq!(fake.count("conv"), 0);
}

#[test]
fn test_svg_stays_svg_for_non_latex_targets() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![code_block(
            &["tikz"],
            &[("format", "svg"), ("embed-mode", "raw")],
            NODE,
        )],
    );

    processor(&fake, "docx", base.path()).process_document(&mut doc);

    // Non-HTML targets always link.
    assert_eq!(image_url(&doc.blocks()[0]), "images/tikz-image-1.svg");
}

#[test]
fn test_layering_attribute_over_directive_over_metadata() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let meta = tikz_meta(&[
        ("format", meta_string("pdf")),
        ("embed_mode", meta_string("inline")),
        ("folder", meta_string("meta-folder")),
    ]);
    let directive_source = format!("%| format: svg\n%| folder: directive-folder\n{NODE}");
    let mut doc = document(
        meta,
        vec![
            // metadata only
            code_block(&["tikz"], &[], NODE),
            // directive overrides metadata
            code_block(&["tikz"], &[], &directive_source),
            // attribute overrides directive
            code_block(
                &["tikz"],
                &[("format", "pdf"), ("folder", "attr-folder")],
                &directive_source,
            ),
        ],
    );

    processor(&fake, "html", base.path()).process_document(&mut doc);

    let blocks = doc.blocks();
    // pdf forces link mode
    assert_eq!(image_url(&blocks[0]), "meta-folder/tikz-image-1.pdf");
    assert!(image_url(&blocks[1]).starts_with("data:image/svg+xml;base64,"));
    assert_eq!(image_url(&blocks[2]), "attr-folder/tikz-image-3.pdf");
}

#[test]
fn test_directives_are_not_rendered() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![code_block(
            &["tikz"],
            &[],
            &format!("%| format: pdf\n%| filename: keep\n{NODE}"),
        )],
    );

    processor(&fake, "latex", base.path()).process_document(&mut doc);

    let pdf = fs::read_to_string(base.path().join("images/keep.pdf")).unwrap();
    assert!(pdf.contains(NODE));
    assert!(!pdf.contains("%|"));
}

#[test]
fn test_invalid_format_never_runs_tools() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let original = code_block(&["tikz"], &[("format", "bmp")], NODE);
    let mut doc = document(json!({}), vec![original.clone()]);
    let mut processor = processor(&fake, "html", base.path());

    assert_eq!(processor.process_document(&mut doc), 0);

    assert_eq!(fake.total(), 0);
    assert_eq!(doc.blocks()[0], original);
    assert_eq!(processor.warnings().len(), 1);
    assert!(processor.warnings()[0].contains("invalid value 'bmp' for 'format'"));
}

#[test]
fn test_default_filenames_are_distinct() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let blocks = (0..4)
        .map(|i| {
            code_block(
                &["tikz"],
                &[("embed-mode", "link")],
                &format!("\\node at ({i},0) {{{i}}};"),
            )
        })
        .collect();
    let mut doc = document(json!({}), blocks);

    processor(&fake, "html", base.path()).process_document(&mut doc);

    let mut urls: Vec<&str> = doc.blocks().iter().map(image_url).collect();
    assert_eq!(
        urls,
        vec![
            "images/tikz-image-1.svg",
            "images/tikz-image-2.svg",
            "images/tikz-image-3.svg",
            "images/tikz-image-4.svg",
        ]
    );
    urls.dedup();
    assert_eq!(urls.len(), 4);
}

#[test]
fn test_explicit_filename_clashing_with_default_warns() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![
            code_block(
                &["tikz"],
                &[("embed-mode", "link"), ("filename", "tikz-image-2")],
                NODE,
            ),
            code_block(&["tikz"], &[("embed-mode", "link")], "\\draw (0,0) -- (1,1);"),
        ],
    );
    let mut processor = processor(&fake, "html", base.path());

    processor.process_document(&mut doc);

    assert_eq!(image_url(&doc.blocks()[0]), "images/tikz-image-2.svg");
    assert_eq!(image_url(&doc.blocks()[1]), "images/tikz-image-2.svg");
    assert_eq!(processor.warnings().len(), 1);
    assert!(
        processor.warnings()[0].starts_with("diagram 2: filename 'tikz-image-2' is already used"),
        "{:?}",
        processor.warnings()
    );
}

#[test]
fn test_inline_diagrams_may_share_a_filename() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![
            code_block(&["tikz"], &[("filename", "same")], NODE),
            code_block(&["tikz"], &[("filename", "same")], NODE),
        ],
    );
    let mut processor = processor(&fake, "html", base.path());

    processor.process_document(&mut doc);

    assert!(processor.warnings().is_empty(), "{:?}", processor.warnings());
}

#[test]
fn test_typeset_failure_keeps_block() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let broken = code_block(&["tikz"], &[], "\\fail");
    let mut doc = document(
        json!({}),
        vec![
            code_block(&["tikz"], &[], NODE),
            broken.clone(),
            code_block(&["tikz"], &[], "\\draw (0,0) -- (1,1);"),
        ],
    );
    let mut processor = processor(&fake, "html", base.path());

    assert_eq!(processor.process_document(&mut doc), 2);

    let blocks = doc.blocks();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0]["t"], "Para");
    assert_eq!(blocks[1], broken);
    assert_eq!(blocks[2]["t"], "Para");
    assert_eq!(processor.summary().failed, 1);
    assert_eq!(processor.summary().rendered, 2);
    assert_eq!(
        processor.warnings(),
        ["diagram 2: typeset stage failed with exit code 1".to_owned()]
    );
    // the failing block never reaches the converter
    assert_eq!(fake.count("tex"), 3);
    assert_eq!(fake.count("conv"), 2);
}

#[test]
fn test_typeset_failure_dropped_when_configured() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        tikz_meta(&[("on-error", meta_string("drop"))]),
        vec![
            code_block(&["tikz"], &[], "\\fail"),
            code_block(&["tikz"], &[], NODE),
        ],
    );

    processor(&fake, "html", base.path()).process_document(&mut doc);

    assert_eq!(doc.block_count(), 1);
    assert_eq!(doc.blocks()[0]["t"], "Para");
}

#[test]
fn test_cache_hit_skips_tools_and_matches_output() {
    let base = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let meta = tikz_meta(&[
        ("cache", json!({"t": "MetaBool", "c": true})),
        ("cache-dir", meta_string(&cache.path().to_string_lossy())),
    ]);
    let make_doc = || document(meta.clone(), vec![code_block(&["tikz"], &[], NODE)]);
    let mut processor = processor(&fake, "html", base.path());

    let mut first = make_doc();
    processor.process_document(&mut first);
    assert_eq!(fake.count("tex"), 1);
    assert_eq!(processor.summary().rendered, 1);

    let mut second = make_doc();
    processor.process_document(&mut second);

    assert_eq!(fake.count("tex"), 1);
    assert_eq!(fake.count("conv"), 1);
    assert_eq!(processor.summary().cache_hits, 1);
    assert_eq!(first, second);
}

#[test]
fn test_cache_shared_across_processors() {
    let base = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let meta = tikz_meta(&[("cache", json!({"t": "MetaBool", "c": true}))]);
    let make_doc = || document(meta.clone(), vec![code_block(&["tikz"], &[], NODE)]);

    for _ in 0..2 {
        let mut doc = make_doc();
        processor(&fake, "html", base.path())
            .cache_dir(Some(cache.path().to_path_buf()))
            .process_document(&mut doc);
    }

    assert_eq!(fake.count("tex"), 1);
    assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 1);
}

#[test]
fn test_cache_write_failure_still_embeds_image() {
    let base = tempfile::tempdir().unwrap();
    let blocker = base.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let fake = FakeToolchain::default();
    let meta = tikz_meta(&[
        ("cache", json!({"t": "MetaBool", "c": true})),
        ("cache-dir", meta_string(&blocker.to_string_lossy())),
    ]);
    let mut doc = document(meta, vec![code_block(&["tikz"], &[], NODE)]);
    let mut processor = processor(&fake, "html", base.path());

    processor.process_document(&mut doc);

    assert_eq!(doc.blocks()[0]["t"], "Para");
    assert!(image_url(&doc.blocks()[0]).starts_with("data:image/svg+xml;base64,"));
    assert_eq!(processor.summary().rendered, 1);
    assert_eq!(processor.summary().failed, 0);
    assert!(
        processor
            .warnings()
            .iter()
            .any(|w| w.starts_with("diagram 1: failed to write cache entry")),
        "{:?}",
        processor.warnings()
    );
}

#[test]
fn test_option_change_misses_cache() {
    let base = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let meta = tikz_meta(&[("cache", json!({"t": "MetaBool", "c": true}))]);
    let mut doc = document(
        meta,
        vec![
            code_block(&["tikz"], &[], NODE),
            code_block(&["tikz"], &[("libraries", "calc")], NODE),
        ],
    );

    processor(&fake, "html", base.path())
        .cache_dir(Some(cache.path().to_path_buf()))
        .process_document(&mut doc);

    assert_eq!(fake.count("tex"), 2);
}

#[test]
fn test_captioned_block_becomes_figure() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        json!({}),
        vec![json!({"t": "CodeBlock", "c": [
            ["fig-graph", ["tikz", "wide"], [["caption", "A graph"], ["width", "4cm"]]],
            NODE,
        ]})],
    );

    processor(&fake, "html", base.path()).process_document(&mut doc);

    let figure = &doc.blocks()[0];
    assert_eq!(figure["t"], "Figure");
    assert_eq!(figure["c"][0], json!(["fig-graph", ["wide"], []]));
    let image = &figure["c"][2][0]["c"][0];
    assert_eq!(image["c"][0], json!(["", [], [["width", "4cm"]]]));
}

#[test]
fn test_save_tex_keeps_wrapper() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let mut doc = document(
        tikz_meta(&[("save-tex", json!({"t": "MetaBool", "c": true}))]),
        vec![code_block(&["tikz"], &[], NODE)],
    );

    processor(&fake, "html", base.path()).process_document(&mut doc);

    let wrapper =
        fs::read_to_string(base.path().join("tikz-tex/tikz-image-1/tikz-image-1.tex")).unwrap();
    assert!(wrapper.contains("\\documentclass"));
    assert!(wrapper.contains(NODE));
}

#[test]
fn test_other_code_blocks_untouched() {
    let base = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::default();
    let python = code_block(&["python"], &[], "print('tikz')");
    let mut doc = document(json!({}), vec![python.clone()]);

    let changed = processor(&fake, "html", base.path()).process_document(&mut doc);

    assert_eq!(changed, 0);
    assert_eq!(doc.blocks()[0], python);
    assert_eq!(fake.total(), 0);
}
