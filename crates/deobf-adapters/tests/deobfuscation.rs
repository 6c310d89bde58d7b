
use deobf_adapters::classfile::{ClassBuilder, ClassFile};
use deobf_adapters::deobfuscator::{marker_name, BinaryDeobfuscator};
use deobf_mapping::srg::parse_srg;
use deobf_mapping::{AccessTransformerSet, MappingTable};
use test_support::{obfuscated_bundle, symbol_set, write, NOTCH_SRG};

#[test]
fn deobfuscating_with_the_inverse_table_restores_the_symbol_set() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("obf");
    obfuscated_bundle(&input);
    let table = parse_srg(NOTCH_SRG.as_bytes(), "notch-srg.srg").unwrap();
    let ats = AccessTransformerSet::new();

    let forward = dir.path().join("srg");
    let report = BinaryDeobfuscator::new(&table, &ats, false).deobfuscate_bundle(&input, &forward)
                                                             .unwrap();
    assert_eq!(report.classes, 2);
    assert_eq!(report.resources, 1);
    let renamed = symbol_set(&forward);
    assert!(renamed.contains("class net/minecraft/Bar extends net/minecraft/Foo"));
    assert!(renamed.contains("method net/minecraft/Foo.func_2_c (Lnet/minecraft/Foo;)V"));
    assert!(renamed.contains("ref net/minecraft/Foo.field_1_b I"));
    assert!(forward.join("net/minecraft/Foo.class").is_file());

    let inverse = table.inverse();
    let back = dir.path().join("back");
    BinaryDeobfuscator::new(&inverse, &ats, false).deobfuscate_bundle(&forward, &back)
                                                  .unwrap();
    assert_eq!(symbol_set(&back), symbol_set(&input));
}

#[test]
fn marker_mode_keeps_names_and_paths() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("obf");
    obfuscated_bundle(&input);
    let table = parse_srg(NOTCH_SRG.as_bytes(), "notch-srg.srg").unwrap();
    let ats = AccessTransformerSet::new();

    let out = dir.path().join("marked");
    let report = BinaryDeobfuscator::new(&table, &ats, true).deobfuscate_bundle(&input, &out)
                                                            .unwrap();
    assert!(report.markers > 0);
    assert_eq!(symbol_set(&out), symbol_set(&input));

    let class = ClassFile::parse(&std::fs::read(out.join("a.class")).unwrap()).unwrap();
    assert_eq!(marker_name(&class, &class.attributes), Some("net/minecraft/Foo"));
}

#[test]
fn absent_transformer_target_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("obf");
    obfuscated_bundle(&input);
    let table = parse_srg(NOTCH_SRG.as_bytes(), "notch-srg.srg").unwrap();
    let ats = AccessTransformerSet::parse("public net.minecraft.Foo field_1_b\npublic net.minecraft.Missing\n".as_bytes(),
                                          "test_at.cfg").unwrap();

    let report = BinaryDeobfuscator::new(&table, &ats, false).deobfuscate_bundle(&input, &dir.path().join("out"))
                                                             .unwrap();
    assert_eq!(report.unmatched_ats, vec!["public net.minecraft.Missing".to_string()]);
}

#[test]
fn references_to_external_classes_survive_a_colliding_target_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("obf");
    let a = ClassBuilder::new("a", "java/lang/Object").unwrap()
                                                      .method(0x0001, "b", "()Ljava/lang/String;")
                                                      .unwrap()
                                                      .member_ref(true, "java/lang/Class", "getName", "()Ljava/lang/String;")
                                                      .unwrap()
                                                      .member_ref(true, "a", "b", "()Ljava/lang/String;")
                                                      .unwrap()
                                                      .to_bytes();
    write(&input, "a.class", &a);
    let mut table = MappingTable::new();
    table.insert_method("a", "b", "()Ljava/lang/String;", "getName");
    let ats = AccessTransformerSet::new();

    let forward = dir.path().join("named");
    BinaryDeobfuscator::new(&table, &ats, false).deobfuscate_bundle(&input, &forward)
                                                .unwrap();
    let named = symbol_set(&forward);
    assert!(named.contains("method a.getName ()Ljava/lang/String;"));
    assert!(named.contains("ref java/lang/Class.getName ()Ljava/lang/String;"));

    let inverse = table.inverse();
    let back = dir.path().join("back");
    BinaryDeobfuscator::new(&inverse, &ats, false).deobfuscate_bundle(&forward, &back)
                                                  .unwrap();
    let restored = symbol_set(&back);
    assert!(restored.contains("ref java/lang/Class.getName ()Ljava/lang/String;"));
    assert!(restored.contains("ref a.b ()Ljava/lang/String;"));
    assert_eq!(restored, symbol_set(&input));
}
