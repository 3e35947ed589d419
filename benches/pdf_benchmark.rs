//! Performance benchmarks for the PDF reader
//!
//! Run with: `cargo bench`
//!
//! Benchmark documents are generated with lopdf so no binary fixtures are
//! checked in. All benchmarks skip when no PDFium library is installed.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdf_reader_mcp::pdf::{extract_pages, read_document_info, PageSelection};
use pdf_reader_mcp::Error;

/// Assemble a document with one page per content stream.
fn build_pdf(contents: &[Vec<u8>]) -> Vec<u8> {
    use lopdf::{dictionary, Object, Stream};

    let mut doc = lopdf::Document::with_version("1.5");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ];

    let mut page_ids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.clone()));
        let page_dict = dictionary! {
            "Type" => "Page",
            "MediaBox" => media_box.clone(),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        };
        page_ids.push(doc.add_object(page_dict));
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(contents.len() as i64),
    });

    for &pid in &page_ids {
        if let Ok(page_obj) = doc.get_object_mut(pid) {
            if let Ok(dict) = page_obj.as_dict_mut() {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("Failed to serialize document");
    buf
}

/// Content stream with ten lines of text.
fn page_content(page: usize) -> Vec<u8> {
    let mut ops = String::from("BT /F1 12 Tf 72 760 Td 14 TL\n");
    for line in 0..10 {
        ops.push_str(&format!(
            "(Page {page} line {line} with a handful of words to lay out) Tj T*\n"
        ));
    }
    ops.push_str("ET");
    ops.into_bytes()
}

fn pdf_with_page_count(pages: usize) -> Vec<u8> {
    let contents: Vec<Vec<u8>> = (1..=pages).map(page_content).collect();
    build_pdf(&contents)
}

/// Single page carrying a ruled 2x2 table plus a paragraph of text.
fn pdf_with_table() -> Vec<u8> {
    let content = b"
        1 w
        100 700 m 300 700 l S
        100 680 m 300 680 l S
        100 660 m 300 660 l S
        100 700 m 100 660 l S
        200 700 m 200 660 l S
        300 700 m 300 660 l S
        BT /F1 10 Tf 110 685 Td (Alpha) Tj ET
        BT /F1 10 Tf 210 685 Td (Beta) Tj ET
        BT /F1 10 Tf 110 665 Td (Gamma) Tj ET
        BT /F1 10 Tf 210 665 Td (Delta) Tj ET
        BT /F1 12 Tf 72 600 Td (A paragraph of body text below the table) Tj ET
    ";
    build_pdf(&[content.to_vec()])
}

/// True when a PDFium library is present. Benchmarks return early without
/// registering anything when it is not.
fn pdfium_available() -> bool {
    let probe = pdf_with_page_count(1);
    match extract_pages(&probe, &PageSelection::All, false) {
        Err(Error::Pdfium { reason }) if reason.contains("Failed to initialize PDFium") => {
            eprintln!("PDFium library not found; skipping benchmarks");
            false
        }
        _ => true,
    }
}

/// Benchmark text extraction at several document sizes
fn bench_text_extraction(c: &mut Criterion) {
    if !pdfium_available() {
        return;
    }

    let mut group = c.benchmark_group("text_extraction");

    for pages in [1, 10, 50] {
        let data = pdf_with_page_count(pages);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("extract_all", format!("{}_pages", pages)),
            &data,
            |b, data| {
                b.iter(|| {
                    let _ = extract_pages(black_box(data), &PageSelection::All, false).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark extracting a single page out of a larger document
fn bench_page_selection(c: &mut Criterion) {
    if !pdfium_available() {
        return;
    }

    let data = pdf_with_page_count(50);
    let selection = PageSelection::Pages(vec![25]);

    c.bench_function("single_page_of_50", |b| {
        b.iter(|| {
            let _ = extract_pages(black_box(&data), &selection, false).unwrap();
        });
    });
}

/// Benchmark table detection against plain text extraction on the same page
fn bench_table_detection(c: &mut Criterion) {
    if !pdfium_available() {
        return;
    }

    let data = pdf_with_table();

    let mut group = c.benchmark_group("table_detection");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("text_only", |b| {
        b.iter(|| {
            let _ = extract_pages(black_box(&data), &PageSelection::All, false).unwrap();
        });
    });

    group.bench_function("with_tables", |b| {
        b.iter(|| {
            let _ = extract_pages(black_box(&data), &PageSelection::All, true).unwrap();
        });
    });

    group.finish();
}

/// Benchmark metadata extraction (should be fast, no page content work)
fn bench_metadata_extraction(c: &mut Criterion) {
    if !pdfium_available() {
        return;
    }

    let data = pdf_with_page_count(50);

    c.bench_function("metadata_extraction", |b| {
        b.iter(|| {
            let _ = read_document_info(black_box(&data)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_text_extraction,
    bench_page_selection,
    bench_table_detection,
    bench_metadata_extraction,
);

criterion_main!(benches);
