/// Integration tests on serializing and re-parsing TIFF tag trees.
use bytes::Bytes;
use jpeg_tiff_meta::{DataName, Endianness, Tag, Tiff, Type, Value};

mod util;

fn ascii(id: u16, text: &str) -> Tag {
    Tag::new(id, Value::Ascii(text.into()))
}

fn reparse(tiff: &Tiff) -> Tiff {
    Tiff::from_bytes(&tiff.to_bytes().unwrap()).unwrap()
}

fn sample_tree() -> Tiff {
    let mut tiff = Tiff::new();
    tiff.set_tag("/ifd[0]", ascii(0x010F, "Maker")).unwrap();
    tiff.set_tag("/ifd[0]", Tag::new(0x011A, Value::Rational(vec![[72, 1]])))
        .unwrap();
    tiff.set_tag("/ifd[0]/exif[0]/ifd[0]", Tag::new(0x9000, Value::UndefinedList(b"0230".to_vec())))
        .unwrap();
    tiff.set_tag("/ifd[0]/exif[0]/ifd[0]/interoperability[0]/ifd[0]", ascii(0x0001, "R98"))
        .unwrap();
    tiff.set_tag("/ifd[0]/gps[0]/ifd[0]", Tag::new(0x0000, Value::ByteList(vec![2, 3, 0, 0])))
        .unwrap();
    tiff.set_tag("/ifd[0]/gps[0]/ifd[0]", ascii(0x0001, "N")).unwrap();
    tiff.set_data(
        "/ifd[1]",
        DataName::JpegInterchangeFormat,
        vec![Bytes::from_static(&[0xff, 0xd8, 0xff, 0xd9])],
    )
    .unwrap();
    tiff.set_data(
        "/ifd[0]/subifds[1]/ifd[0]",
        DataName::Strips,
        vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")],
    )
    .unwrap();
    tiff
}

#[test]
fn test_ascii_tag_removed() {
    let mut tiff = Tiff::from_bytes(&util::single_ascii_tiff(0x010E, "test")).unwrap();
    assert_eq!(tiff.tags("/ifd[0]").unwrap().unwrap().len(), 1);
    assert_eq!(tiff.tag("/ifd[0]", 0x010E).unwrap().unwrap().value.as_str(), Some("test"));

    assert!(tiff.remove_tag("/ifd[0]", 0x010E).unwrap().is_some());
    let bytes = tiff.to_bytes().unwrap();
    assert_eq!(&bytes[8..10], &[0, 0]);
    let reparsed = Tiff::from_bytes(&bytes).unwrap();
    assert_eq!(reparsed.tags("/ifd[0]").unwrap(), Some(&[][..]));
    assert_eq!(reparsed.tags("/ifd[1]").unwrap(), None);
}

#[test]
fn test_strips_written_as_long_pair() {
    let mut tiff = Tiff::new();
    tiff.set_data("/ifd[0]", DataName::Strips, vec![Bytes::from(vec![7u8; 10])])
        .unwrap();

    let bytes = tiff.to_bytes().unwrap();
    assert_eq!(bytes.len(), 38 + 10);
    assert_eq!(&bytes[38..], &[7u8; 10]);

    let reparsed = Tiff::from_bytes(&bytes).unwrap();
    let offsets = reparsed.tag("/ifd[0]", 0x0111).unwrap().unwrap();
    let counts = reparsed.tag("/ifd[0]", 0x0117).unwrap().unwrap();
    assert_eq!(offsets.field_type(), Type::LONG);
    assert_eq!(counts.field_type(), Type::LONG);
    assert_eq!(offsets.value, Value::Long(38));
    assert_eq!(counts.value, Value::Long(10));
    assert_eq!(
        reparsed.data("/ifd[0]", DataName::Strips).unwrap(),
        Some(&[Bytes::from(vec![7u8; 10])][..])
    );
}

#[test]
#[rustfmt::skip]
fn test_big_endian_out_of_line_shorts() {
    let mut tiff = Tiff::new();
    tiff.set_tag("/ifd[0]", Tag::new(0x0102, Value::ShortList(vec![8, 8, 8]))).unwrap();
    let bytes = tiff.to_bytes_with(Endianness::BigEndian).unwrap();
    assert_eq!(bytes, vec![
        b'M', b'M', 0, 42, 0, 0, 0, 8,
        0, 1,
        0x01, 0x02, 0, 3, 0, 0, 0, 3, 0, 0, 0, 26,
        0, 0, 0, 0,
        0, 8, 0, 8, 0, 8,
    ]);

    let reparsed = Tiff::from_bytes(&bytes).unwrap();
    assert_eq!(reparsed.endianness(), Endianness::BigEndian);
    assert_eq!(
        reparsed.tag("/ifd[0]", 0x0102).unwrap().unwrap().value,
        Value::ShortList(vec![8, 8, 8])
    );
}

#[test]
fn test_single_elements_parse_as_scalars() {
    let mut tiff = Tiff::new();
    tiff.set_tag("/ifd[0]", Tag::new(0x0100, Value::Short(640))).unwrap();
    tiff.set_tag("/ifd[0]", Tag::new(0x0102, Value::ShortList(vec![8, 8, 8]))).unwrap();
    tiff.set_tag("/ifd[0]", Tag::new(0x0103, Value::ShortList(vec![7]))).unwrap();
    tiff.set_tag("/ifd[0]", Tag::new(0x0104, Value::Double(0.25))).unwrap();
    tiff.set_tag("/ifd[0]", Tag::new(0x0105, Value::SignedByteList(vec![]))).unwrap();
    tiff.set_tag("/ifd[0]", Tag::new(0x011A, Value::Rational(vec![[72, 1]]))).unwrap();

    let reparsed = reparse(&tiff);
    let value = |id| reparsed.tag("/ifd[0]", id).unwrap().unwrap().value.clone();
    assert_eq!(value(0x0100), Value::Short(640));
    assert_eq!(value(0x0102), Value::ShortList(vec![8, 8, 8]));
    // a one-element list is written with count 1
    assert_eq!(value(0x0103), Value::Short(7));
    assert_eq!(value(0x0104), Value::Double(0.25));
    assert_eq!(value(0x0105), Value::SignedByteList(vec![]));
    assert_eq!(value(0x011A), Value::Rational(vec![[72, 1]]));
    assert_eq!(reparsed.to_bytes().unwrap(), tiff.to_bytes().unwrap());
}

#[test]
fn test_rational_list() {
    let mut tiff = Tiff::new();
    let value = Value::Rational(vec![[72, 1], [300, 4]]);
    tiff.set_tag("/ifd[0]", Tag::new(0x011A, value.clone())).unwrap();

    let bytes = tiff.to_bytes().unwrap();
    assert_eq!(&bytes[14..18], &[2, 0, 0, 0]);
    assert_eq!(&bytes[18..22], &[26, 0, 0, 0]);
    assert_eq!(bytes.len(), 26 + 16);

    let tag = reparse(&tiff).tag("/ifd[0]", 0x011A).unwrap().unwrap().clone();
    assert_eq!(tag.value, value);
    assert_eq!(tag.value.count(), 2);
}

#[test]
fn test_removed_branch_leaves_no_pointer() {
    let tiff = reparse(&sample_tree());
    let before = tiff.tags("/ifd[0]").unwrap().unwrap().len();
    assert!(tiff.tag("/ifd[0]", 0x8825).unwrap().is_some());

    let mut edited = tiff.clone();
    assert!(edited.remove_branch("/ifd[0]", 0x8825).unwrap());
    assert!(!edited.remove_branch("/ifd[0]", 0x8825).unwrap());

    let reparsed = reparse(&edited);
    assert_eq!(reparsed.tags("/ifd[0]").unwrap().unwrap().len(), before - 1);
    assert_eq!(reparsed.tag("/ifd[0]", 0x8825).unwrap(), None);
    assert_eq!(reparsed.branch_len("/ifd[0]", 0x8825).unwrap(), None);
    assert!(reparsed.tag("/ifd[0]/exif[0]/ifd[0]", 0x9000).unwrap().is_some());
}

#[test]
fn test_paths_created_in_order() {
    let mut tiff = Tiff::new();
    tiff.set_tag("/ifd[2]/exif[1]/ifd[1]", ascii(0x9003, "2024:01:01 00:00:00"))
        .unwrap();

    let reparsed = reparse(&tiff);
    for path in ["/ifd[0]", "/ifd[1]", "/ifd[2]/exif[0]/ifd[0]", "/ifd[2]/exif[1]/ifd[0]"] {
        assert_eq!(reparsed.tags(path).unwrap(), Some(&[][..]), "{path}");
    }
    assert_eq!(reparsed.branch_len("/ifd[2]", 0x8769).unwrap(), Some(2));
    assert!(reparsed.tag("/ifd[2]/exif[1]/ifd[1]", 0x9003).unwrap().is_some());
    assert_eq!(reparsed.tags("/ifd[3]").unwrap(), None);
}

#[test]
fn test_reserialization_is_stable() {
    let tiff = sample_tree();
    let first = tiff.to_bytes().unwrap();
    let second = Tiff::from_bytes(&first).unwrap().to_bytes().unwrap();
    assert_eq!(first, second);

    let big = tiff.to_bytes_with(Endianness::BigEndian).unwrap();
    let parsed = Tiff::from_bytes(&big).unwrap();
    assert_eq!(parsed.to_bytes().unwrap(), big);
    assert_eq!(
        parsed.enumerate_tags().len(),
        Tiff::from_bytes(&first).unwrap().enumerate_tags().len()
    );
}

#[test]
fn test_enumerate_parsed_tree() {
    let tiff = reparse(&sample_tree());
    let data = tiff
        .enumerate_data()
        .into_iter()
        .map(|(path, name, chunks)| (path.to_string(), name, chunks.len()))
        .collect::<Vec<_>>();
    assert_eq!(
        data,
        vec![
            ("/ifd[0]/subifds[1]/ifd[0]".to_string(), DataName::Strips, 2),
            ("/ifd[1]".to_string(), DataName::JpegInterchangeFormat, 1),
        ]
    );
    assert_eq!(
        tiff.data("/ifd[0]/subifds[1]/ifd[0]", DataName::Strips).unwrap().unwrap()[1].as_ref(),
        b"second"
    );
    // the unused first sub-IFD trunk is written as one empty directory
    assert_eq!(tiff.tags("/ifd[0]/subifds[0]/ifd[0]").unwrap(), Some(&[][..]));
}
