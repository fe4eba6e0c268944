//! Round-trip and idempotence properties spanning the header parser,
//! builder, Properties schema, row decoder and writer together.
use extxyz::{compile_grammar, read_record, write_record, ReadBuffer};

fn parse_one(text: &str) -> extxyz::Record {
    let grammar = compile_grammar().unwrap();
    let mut rb = ReadBuffer::from_slice(text.as_bytes());
    read_record(&grammar, &mut rb).unwrap().unwrap()
}

fn serialize(record: &extxyz::Record) -> String {
    let mut out = Vec::new();
    write_record(record, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_round_trip_preserves_record() {
    let text = "2\nLattice=\"1 0 0 0 1 0 0 0 1\" Properties=species:S:1:pos:R:3 energy=-3.14\nC 0.0 0.0 0.0\nO 1.0 2.0 3.0\n";
    let original = parse_one(text);
    let written = serialize(&original);
    let reparsed = parse_one(&written);
    assert_eq!(original, reparsed);
}

#[test]
fn test_idempotent_serialize() {
    let text = "2\nLattice=[[1,0,0],[0,1,0],[0,0,1]] Properties=species:S:1:pos:R:3\nC 0.0 0.0 0.0\nO 1.0 2.0 3.0\n";
    let first = serialize(&parse_one(text));
    let second = serialize(&parse_one(&first));
    assert_eq!(first, second);
}

#[test]
fn test_round_trip_plain_xyz_verbatim() {
    let text = "1\nhello world\nH 0 0 0\n";
    let original = parse_one(text);
    assert_eq!(serialize(&original), text);
}

#[test]
fn test_shape_consistency_across_arrays() {
    let text = "2\nProperties=species:S:1:pos:R:3:forces:R:3\nH 0.0 0.0 0.0 0.1 0.0 0.0\nH 0.0 0.0 1.0 -0.1 0.0 0.0\n";
    let record = parse_one(text);
    for entry in &record.arrays {
        let cols = entry.shape.1.max(1);
        assert_eq!(entry.data.len(), record.nat * cols);
    }
}

#[test]
fn test_type_promotion_property() {
    let record = parse_one("1\nv=[1,2.5,3]\nH 0 0 0\n");
    let v = record.info.get("v").unwrap();
    assert_eq!(v.type_tag, extxyz::TypeTag::Float);
}

#[test]
fn test_legacy_nine_vector_is_transposed() {
    let record = parse_one("1\nLattice=\"1 2 3 4 5 6 7 8 9\"\nH 0 0 0\n");
    let lattice = record.info.get("Lattice").unwrap();
    assert_eq!(lattice.shape, (3, 3));
    for i in 0..3 {
        for j in 0..3 {
            let expected = (j * 3 + i + 1) as i64;
            assert_eq!(lattice.data[i * 3 + j], extxyz::Value::Int(expected));
        }
    }
}
