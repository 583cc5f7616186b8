//! End-to-end benchmarks: load → erase → save.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use lopdf::{dictionary, Document, Object, Stream};

use eraser_core::options::EraseOptions;
use eraser_pdf::BoxEraser;

/// Generate a PDF with N pages, each drawing text inside a bordered box and
/// sharing one boxed Form XObject.
fn generate_pdf(num_pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let form_id = doc.add_object(Stream::new(
        dictionary! { "Type" => "XObject", "Subtype" => "Form" },
        b"q 0.5 g 0 0 200 20 re f Q".to_vec(),
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Fm0" => form_id },
    });

    let mut kids = Vec::with_capacity(num_pages);
    for i in 0..num_pages {
        let content = format!(
            "q 1 0 0 RG 50 50 500 700 re S Q\n\
             BT /F1 12 Tf 72 700 Td (Page {}) Tj ET\n\
             /Fm0 Do\n\
             0 0 1 rg 60 600 100 40 re f\n",
            i + 1
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => num_pages as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn bench_erase_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("E2E_erase_in_memory");
    group.sample_size(10);

    for n in [10, 100] {
        let doc = generate_pdf(n);
        group.bench_function(format!("{}_pages", n), |b| {
            let eraser = BoxEraser::new(EraseOptions::default());
            b.iter(|| {
                let mut doc = doc.clone();
                black_box(eraser.erase_document(&mut doc, None, None).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_erase_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("E2E_erase_file");
    group.sample_size(10);

    let tmp_dir = tempfile::TempDir::new().unwrap();
    for n in [10, 100] {
        let input_path = tmp_dir.path().join(format!("bench_{}.pdf", n));
        generate_pdf(n).save(&input_path).unwrap();

        group.bench_function(format!("{}_pages", n), |b| {
            let eraser = BoxEraser::new(EraseOptions::default());
            b.iter(|| {
                let processed = eraser
                    .process_pdf_file(black_box(&input_path), None, None)
                    .unwrap();
                std::fs::remove_file(&processed.path).ok();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_erase_in_memory, bench_erase_file);
criterion_main!(benches);
