use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use cfb::CompoundFile;
use tempfile::tempdir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::filetype::FileType;
use crate::{
    clean_file_metadata, compute_content_hash, detect_file_metadata, legacy_office_props_state,
};

// ---------------- JPEG ----------------

fn push_segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    out.push(0xFF);
    out.push(marker);
    out.extend_from_slice(&((payload.len() as u16 + 2).to_be_bytes()));
    out.extend_from_slice(payload);
}

fn sample_jpeg_with_metadata() -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];

    // APP0 JFIF: no es metadata sensible y debe sobrevivir.
    push_segment(
        &mut jpeg,
        0xE0,
        b"JFIF\x00\x01\x02\x00\x00\x01\x00\x01\x00\x00",
    );

    let mut exif = b"Exif\x00\x00".to_vec();
    exif.extend_from_slice(b"II\x2A\x00\x08\x00\x00\x00\x00\x00");
    push_segment(&mut jpeg, 0xE1, &exif);

    let mut xmp = b"http://ns.adobe.com/xap/1.0/\x00".to_vec();
    xmp.extend_from_slice(b"<x:xmpmeta><rdf:RDF/></x:xmpmeta>");
    push_segment(&mut jpeg, 0xE1, &xmp);

    push_segment(&mut jpeg, 0xED, b"Photoshop 3.0\x008BIM\x04\x04");

    // Tabla de cuantizacion ficticia, tambien debe sobrevivir.
    push_segment(&mut jpeg, 0xDB, &[0x00, 0x10, 0x20, 0x30, 0x40]);

    // SOS + datos comprimidos + EOI.
    jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x04, 0x01, 0x00]);
    jpeg.extend_from_slice(&[0x11, 0x22, 0x33, 0x44]);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

#[test]
fn jpeg_detects_exif_xmp_and_iptc() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("foto.jpg");
    fs::write(&source, sample_jpeg_with_metadata())?;

    let report = detect_file_metadata(&source);
    assert!(matches!(report.file_type, FileType::Jpeg));
    assert_eq!(report.summary, vec!["EXIF", "XMP", "IPTC"]);
    assert!(report.can_clean);

    Ok(())
}

#[test]
fn jpeg_clean_preserves_scan_hash() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("foto.jpg");
    let original = sample_jpeg_with_metadata();
    fs::write(&source, &original)?;

    let hash_before = compute_content_hash(&source)?;

    let result = clean_file_metadata(&source, true)?;
    assert!(result.changed);

    let cleaned = fs::read(&source)?;
    assert!(cleaned.starts_with(&[0xFF, 0xD8, 0xFF, 0xE0]));
    assert!(!contains(&cleaned, b"Exif\x00\x00"));
    assert!(!contains(&cleaned, b"http://ns.adobe.com/xap/1.0/"));
    assert!(!contains(&cleaned, b"Photoshop 3.0"));
    assert!(cleaned.ends_with(&[0xFF, 0xD9]));

    let hash_after = compute_content_hash(&source)?;
    assert_eq!(hash_before.digest, hash_after.digest);

    // El respaldo conserva el archivo previo a la limpieza.
    let backup = fs::read(dir.path().join("foto.jpg.bak"))?;
    assert_eq!(backup, original);

    // Segunda pasada: nada que hacer y sin respaldos nuevos.
    let again = clean_file_metadata(&source, true)?;
    assert!(!again.changed);
    assert_eq!(fs::read(&source)?, cleaned);
    assert!(!dir.path().join("foto.jpg.bak.1").exists());

    Ok(())
}

// ---------------- PNG ----------------

fn png_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::new();
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(chunk_type);
    chunk.extend_from_slice(data);
    // El motor nunca valida CRCs, solo los copia tal cual.
    chunk.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    chunk
}

fn sample_png_with_metadata() -> (Vec<u8>, Vec<u8>) {
    let signature = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    let ihdr = png_chunk(b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]);
    let text = png_chunk(b"tEXt", b"Author\x00Alicia");
    let time = png_chunk(b"tIME", &[0x07, 0xE8, 1, 1, 0, 0, 0]);
    let idat = png_chunk(b"IDAT", &[0x78, 0x9C, 0x62, 0x00, 0x01]);
    let iend = png_chunk(b"IEND", &[]);

    let mut with_metadata = signature.to_vec();
    with_metadata.extend_from_slice(&ihdr);
    with_metadata.extend_from_slice(&text);
    with_metadata.extend_from_slice(&time);
    with_metadata.extend_from_slice(&idat);
    with_metadata.extend_from_slice(&iend);

    let mut expected_clean = signature.to_vec();
    expected_clean.extend_from_slice(&ihdr);
    expected_clean.extend_from_slice(&idat);
    expected_clean.extend_from_slice(&iend);

    (with_metadata, expected_clean)
}

#[test]
fn png_clean_drops_text_and_time_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("imagen.png");
    let (original, expected_clean) = sample_png_with_metadata();
    fs::write(&source, &original)?;

    let report = detect_file_metadata(&source);
    assert_eq!(report.summary, vec!["Text chunks:1", "tIME"]);
    assert!(report.can_clean);

    let hash_before = compute_content_hash(&source)?;

    let result = clean_file_metadata(&source, false)?;
    assert!(result.changed);
    assert_eq!(fs::read(&source)?, expected_clean);

    let hash_after = compute_content_hash(&source)?;
    assert_eq!(hash_before.digest, hash_after.digest);

    Ok(())
}

#[test]
fn png_without_metadata_is_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("plana.png");
    let (_, clean_bytes) = sample_png_with_metadata();
    fs::write(&source, &clean_bytes)?;

    let report = detect_file_metadata(&source);
    assert!(!report.can_clean);

    let result = clean_file_metadata(&source, true)?;
    assert!(!result.changed);
    assert_eq!(fs::read(&source)?, clean_bytes);
    assert!(!dir.path().join("plana.png.bak").exists());

    Ok(())
}

// ---------------- GIF ----------------

fn sample_gif_with_comment() -> (Vec<u8>, Vec<u8>) {
    let header = b"GIF89a";
    let screen_descriptor = [0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
    let comment = [0x21, 0xFE, 0x06, b's', b'e', b'c', b'r', b'e', b't', 0x00];
    let image = [
        0x2C, // introductor
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, // descriptor
        0x00, // byte empaquetado, sin tabla de color local
        0x02, // tamano minimo de codigo LZW
        0x02, 0x4C, 0x01, // sub-bloque de datos
        0x00, // terminador
    ];
    let trailer = [0x3B];

    let mut with_comment = header.to_vec();
    with_comment.extend_from_slice(&screen_descriptor);
    with_comment.extend_from_slice(&comment);
    with_comment.extend_from_slice(&image);
    with_comment.extend_from_slice(&trailer);

    let mut expected_clean = header.to_vec();
    expected_clean.extend_from_slice(&screen_descriptor);
    expected_clean.extend_from_slice(&image);
    expected_clean.extend_from_slice(&trailer);

    (with_comment, expected_clean)
}

#[test]
fn gif_clean_drops_comment_extension() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("anim.gif");
    let (original, expected_clean) = sample_gif_with_comment();
    fs::write(&source, &original)?;

    let report = detect_file_metadata(&source);
    assert_eq!(report.summary, vec!["Comments:1"]);
    assert!(report.can_clean);

    let hash_before = compute_content_hash(&source)?;

    let result = clean_file_metadata(&source, false)?;
    assert!(result.changed);
    assert_eq!(fs::read(&source)?, expected_clean);

    let hash_after = compute_content_hash(&source)?;
    assert_eq!(hash_before.digest, hash_after.digest);

    Ok(())
}

#[test]
fn gif_with_unexpected_byte_is_left_alone() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("rota.gif");

    let (mut bytes, _) = sample_gif_with_comment();
    // Introductor de bloque desconocido delante de la imagen.
    let image_offset = bytes.iter().position(|b| *b == 0x2C).unwrap();
    bytes.insert(image_offset, 0x99);
    fs::write(&source, &bytes)?;

    let result = clean_file_metadata(&source, true)?;
    assert!(!result.changed);
    assert_eq!(fs::read(&source)?, bytes, "el archivo no debe corromperse");
    assert!(!dir.path().join("rota.gif.bak").exists());

    Ok(())
}

// ---------------- Office (docx/xlsx/pptx) ----------------

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="jpeg" ContentType="image/jpeg"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
    <Override PartName="/docProps/custom.xml" ContentType="application/vnd.openxmlformats-officedocument.custom-properties+xml"/>
</Types>
"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
    <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail" Target="docProps/thumbnail.jpeg"/>
</Relationships>
"#;

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <w:body>
        <w:p><w:r><w:t>Documento de prueba</w:t></w:r></w:p>
    </w:body>
</w:document>
"#;

const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/"
                   xmlns:dcterms="http://purl.org/dc/terms/"
                   xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:creator>Alicia</dc:creator>
    <cp:lastModifiedBy>Editor Prueba</cp:lastModifiedBy>
    <dcterms:created xsi:type="dcterms:W3CDTF">2024-01-01T00:00:00Z</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">2024-02-01T00:00:00Z</dcterms:modified>
    <dc:title>Documento Demo</dc:title>
</cp:coreProperties>
"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"
            xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>Microsoft Word</Application>
    <Company>Compania Demo</Company>
</Properties>
"#;

const CUSTOM_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties"
            xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="CampoInterno">
        <vt:lpwstr>Dato Confidencial</vt:lpwstr>
    </property>
</Properties>
"#;

fn create_sample_docx(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let mut writer = ZipWriter::new(file);
    let options =
        FileOptions::<'_, ()>::default().compression_method(CompressionMethod::Stored);

    let parts: [(&str, &[u8]); 7] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", RELS_XML.as_bytes()),
        ("word/document.xml", DOCUMENT_XML.as_bytes()),
        ("docProps/core.xml", CORE_XML.as_bytes()),
        ("docProps/app.xml", APP_XML.as_bytes()),
        ("docProps/custom.xml", CUSTOM_XML.as_bytes()),
        ("docProps/thumbnail.jpeg", &[0xFF, 0xD8, 0xFF, 0xD9]),
    ];
    for (name, bytes) in parts {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }
    writer.finish()?;
    Ok(())
}

#[test]
fn docx_detect_lists_docprops_fields() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("informe.docx");
    create_sample_docx(&source)?;

    let report = detect_file_metadata(&source);
    assert!(matches!(report.file_type, FileType::Docx));
    assert!(report.can_clean);
    for label in [
        "Author",
        "LastModifiedBy",
        "Created",
        "Modified",
        "Title",
        "Company",
        "Application",
        "CustomProps:1",
        "Thumbnail",
    ] {
        assert!(
            report.summary.iter().any(|item| item == label),
            "falta la etiqueta {} en {:?}",
            label,
            report.summary
        );
    }

    Ok(())
}

#[test]
fn docx_clean_removes_docprops_and_references() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("informe.docx");
    create_sample_docx(&source)?;
    let original_bytes = fs::read(&source)?;

    let hash_before = compute_content_hash(&source)?;

    let result = clean_file_metadata(&source, true)?;
    assert!(result.changed);

    let mut archive = ZipArchive::new(File::open(&source)?)?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    assert!(
        !names.iter().any(|name| name.starts_with("docProps/")),
        "quedaron partes docProps: {:?}",
        names
    );

    let mut content_types = String::new();
    archive
        .by_name("[Content_Types].xml")?
        .read_to_string(&mut content_types)?;
    assert!(!content_types.contains("docProps"));

    let mut rels = String::new();
    archive.by_name("_rels/.rels")?.read_to_string(&mut rels)?;
    assert!(!rels.contains("docProps"));
    assert!(rels.contains("word/document.xml"));

    let mut document = Vec::new();
    archive
        .by_name("word/document.xml")?
        .read_to_end(&mut document)?;
    assert_eq!(document, DOCUMENT_XML.as_bytes());

    let hash_after = compute_content_hash(&source)?;
    assert_eq!(hash_before.digest, hash_after.digest);

    let backup = dir.path().join("informe.docx.bak");
    assert_eq!(fs::read(&backup)?, original_bytes);

    let again = clean_file_metadata(&source, true)?;
    assert!(!again.changed);

    Ok(())
}

// ---------------- RTF ----------------

#[test]
fn rtf_clean_strips_info_group() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("carta.rtf");
    let body = br"{\rtf1\ansi{\info{\author Alicia}{\creatim\yr2024\mo1\dy1}}Cuerpo}";
    fs::write(&source, body)?;

    let report = detect_file_metadata(&source);
    assert_eq!(report.summary, vec!["Author", "CreateTime"]);
    assert!(report.can_clean);

    let hash_before = compute_content_hash(&source)?;

    let result = clean_file_metadata(&source, false)?;
    assert!(result.changed);
    assert_eq!(fs::read(&source)?, br"{\rtf1\ansiCuerpo}".to_vec());

    let hash_after = compute_content_hash(&source)?;
    assert_eq!(hash_before.digest, hash_after.digest);

    let again = clean_file_metadata(&source, false)?;
    assert!(!again.changed);

    Ok(())
}

// ---------------- PDF ----------------

fn create_sample_pdf(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let content_id = doc.add_object(Object::Stream(Stream::new(
        dictionary! {},
        b"BT /F1 24 Tf 100 700 Td (Hola) Tj ET".to_vec(),
    )));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "Contents" => Object::Reference(content_id),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let metadata_id = doc.add_object(Object::Stream(Stream::new(
        dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
        b"<?xpacket begin=\"\"?><x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/><?xpacket end=\"w\"?>"
            .to_vec(),
    )));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "Metadata" => Object::Reference(metadata_id),
    });
    let info_id = doc.add_object(dictionary! {
        "Author" => Object::string_literal("Alicia"),
        "Title" => Object::string_literal("Secreto"),
    });

    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));
    doc.save(path)?;
    Ok(())
}

#[test]
fn pdf_detect_reports_info_and_xmp() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("reporte.pdf");
    create_sample_pdf(&source)?;

    let report = detect_file_metadata(&source);
    assert!(matches!(report.file_type, FileType::Pdf));
    assert!(report.can_clean);
    for label in ["Author", "Title", "XMP"] {
        assert!(
            report.summary.iter().any(|item| item == label),
            "falta la etiqueta {} en {:?}",
            label,
            report.summary
        );
    }

    Ok(())
}

#[test]
fn pdf_clean_clears_info_and_metadata() -> Result<(), Box<dyn std::error::Error>> {
    use lopdf::{Document, Object};

    let dir = tempdir()?;
    let source = dir.path().join("reporte.pdf");
    create_sample_pdf(&source)?;

    let hash_before = compute_content_hash(&source)?;

    let result = clean_file_metadata(&source, false)?;
    assert!(result.changed);

    let doc = Document::load(&source)?;
    if let Ok(info_ref) = doc.trailer.get(b"Info") {
        let info_dict = match info_ref {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        };
        if let Some(info) = info_dict {
            assert_eq!(info.len(), 0, "el diccionario Info debe quedar vacío");
        }
    }
    let catalog = doc.catalog()?;
    assert!(catalog.get(b"Metadata").is_err());

    let hash_after = compute_content_hash(&source)?;
    assert_eq!(hash_before.digest, hash_after.digest);

    let report = detect_file_metadata(&source);
    assert!(!report.can_clean);

    let again = clean_file_metadata(&source, false)?;
    assert!(!again.changed);

    Ok(())
}

// ---------------- Office heredado (OLE) ----------------

fn create_sample_doc(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut comp = CompoundFile::create(file)?;

    comp.create_stream("/WordDocument")?
        .write_all(b"contenido binario del documento")?;
    comp.create_stream("/\u{5}SummaryInformation")?
        .write_all(b"autor y empresa ocultos")?;
    comp.create_stream("/\u{5}DocumentSummaryInformation")?
        .write_all(b"estadisticas del documento")?;
    comp.flush()?;
    Ok(())
}

#[test]
fn legacy_doc_clean_removes_property_sets() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("viejo.doc");
    create_sample_doc(&source)?;

    assert_eq!(legacy_office_props_state(&source), (true, true));

    let report = detect_file_metadata(&source);
    assert!(matches!(report.file_type, FileType::Doc));
    assert!(report.summary.iter().any(|item| item == "SummaryInfo"));
    assert!(report.summary.iter().any(|item| item == "DocSummaryInfo"));
    assert!(report.can_clean);

    let hash_before = compute_content_hash(&source)?;
    assert_eq!(hash_before.description, "Streams OLE principales");

    let result = clean_file_metadata(&source, true)?;
    assert!(result.changed);

    assert_eq!(legacy_office_props_state(&source), (false, false));

    let comp = CompoundFile::open(File::open(&source)?)?;
    assert!(comp.is_stream("/WordDocument"));
    drop(comp);

    let hash_after = compute_content_hash(&source)?;
    assert_eq!(hash_before.digest, hash_after.digest);

    assert_eq!(legacy_office_props_state(&dir.path().join("viejo.doc.bak")), (true, true));

    let again = clean_file_metadata(&source, true)?;
    assert!(!again.changed);

    Ok(())
}

// ---------------- Word 2003 XML ----------------

const WORD2003_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:wordDocument xmlns:w="http://schemas.microsoft.com/office/word/2003/wordml" xmlns:o="urn:schemas-microsoft-com:office:office">
    <o:DocumentProperties>
        <o:Author>Alicia</o:Author>
        <o:Company>Compania Demo</o:Company>
        <o:Created>2024-01-01T00:00:00Z</o:Created>
    </o:DocumentProperties>
    <o:CustomDocumentProperties>
        <o:Proyecto>Secreto</o:Proyecto>
    </o:CustomDocumentProperties>
    <w:body>
        <w:p><w:r><w:t>Hola mundo</w:t></w:r></w:p>
    </w:body>
</w:wordDocument>
"#;

#[test]
fn word2003_clean_removes_every_property_block() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("memo.xml");
    fs::write(&source, WORD2003_XML)?;

    let report = detect_file_metadata(&source);
    assert!(matches!(report.file_type, FileType::Word2003Xml));
    assert!(report.can_clean);
    for label in ["Author", "Company", "Created", "CustomDocumentProperties"] {
        assert!(
            report.summary.iter().any(|item| item == label),
            "falta la etiqueta {} en {:?}",
            label,
            report.summary
        );
    }

    let result = clean_file_metadata(&source, false)?;
    assert!(result.changed);

    let cleaned = fs::read_to_string(&source)?;
    assert!(cleaned.starts_with("<?xml"));
    assert!(!cleaned.contains("DocumentProperties"));
    assert!(!cleaned.contains("Alicia"));
    assert!(cleaned.contains("Hola mundo"));

    let report_after = detect_file_metadata(&source);
    assert!(!report_after.can_clean);
    assert!(report_after.summary.is_empty());

    let again = clean_file_metadata(&source, false)?;
    assert!(!again.changed);

    Ok(())
}

// ---------------- Utilidades ----------------

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
