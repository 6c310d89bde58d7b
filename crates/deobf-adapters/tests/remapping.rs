
use std::fs;

use deobf_adapters::{AdapterError, ExtractOptions, RangeMapExtractor, RemapDirection, RemapRules, ScopedResolver,
                     SymbolRemapper};
use deobf_mapping::{MappingTable, NameEntry, NameTables};
use test_support::write;

const FOO: &str = "package net.minecraft;\n\
                   \n\
                   public class Foo {\n\
                   \x20   private int field_1_b;\n\
                   \n\
                   \x20   public void func_2_c(Foo p_2_1_) {\n\
                   \x20       // field_1_b stays in comments\n\
                   \x20       this.field_1_b = p_2_1_.field_1_b + unknownThing;\n\
                   \x20   }\n\
                   }\n";

fn dev_table() -> MappingTable {
    let mut names = NameTables::default();
    names.fields.insert("field_1_b".into(), NameEntry::new("health"));
    names.methods.insert("func_2_c".into(), NameEntry::new("merge"));
    names.params.insert("p_2_1_".into(), "other".into());
    MappingTable::from_names(&names)
}

#[test]
fn remap_is_deterministic_and_leaves_unmapped_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("src");
    write(&tree, "net/minecraft/Foo.java", FOO.as_bytes());
    write(&tree, "pack.mcmeta", b"{}");
    let table = dev_table();
    let rules = RemapRules::new();

    let mut outputs = Vec::new();
    for run in 0..2 {
        let resolver = ScopedResolver::new(&table).index_tree(&tree).unwrap();
        let map = RangeMapExtractor::new(&resolver, ExtractOptions::default()).extract(&tree)
                                                                              .unwrap();
        let out = dir.path().join(format!("out{run}"));
        let report = SymbolRemapper::new(&table, &rules, RemapDirection::Dev).remap_tree(&tree, &map, &out)
                                                                             .unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(report.copied, 1);
        outputs.push(fs::read(out.join("net/minecraft/Foo.java")).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
    let text = String::from_utf8(outputs.remove(0)).unwrap();
    assert!(text.contains("private int health;"));
    assert!(text.contains("public void merge(Foo other)"));
    assert!(text.contains("this.health = other.health + unknownThing;"));
    assert!(text.contains("// field_1_b stays in comments"));
}

#[test]
fn range_map_from_another_tree_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("src");
    let foo = write(&tree, "net/minecraft/Foo.java", FOO.as_bytes());
    let table = dev_table();
    let resolver = ScopedResolver::new(&table);
    let map = RangeMapExtractor::new(&resolver, ExtractOptions::default()).extract(&tree)
                                                                          .unwrap();

    fs::write(&foo, FOO.replace("unknownThing", "0")).unwrap();
    let rules = RemapRules::new();
    let out = dir.path().join("out");
    let err = SymbolRemapper::new(&table, &rules, RemapDirection::Dev).remap_tree(&tree, &map, &out)
                                                                      .unwrap_err();
    assert!(matches!(err, AdapterError::StaleRangeMapUsage { ref file, .. } if file == "net/minecraft/Foo.java"));
    assert!(!out.exists());

    // un fichero nuevo tampoco está cubierto por el mapa
    fs::write(&foo, FOO).unwrap();
    write(&tree, "net/minecraft/Added.java", b"class Added {}\n");
    let err = SymbolRemapper::new(&table, &rules, RemapDirection::Dev).remap_tree(&tree, &map, &out)
                                                                      .unwrap_err();
    assert!(matches!(err, AdapterError::StaleRangeMapUsage { .. }));
}

#[test]
fn retro_direction_maps_developer_names_back() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("src");
    write(&tree,
          "net/minecraft/Foo.java",
          b"package net.minecraft;\npublic class Foo {\n    int health;\n    void merge(Foo other) { health = other.health; }\n}\n");
    let mut retro = MappingTable::new();
    retro.insert_field("net/minecraft/Foo", "health", "field_1_b");
    retro.insert_method("net/minecraft/Foo", "merge", "(Lnet/minecraft/Foo;)V", "func_2_c");

    let resolver = ScopedResolver::new(&retro).index_tree(&tree).unwrap();
    let map = RangeMapExtractor::new(&resolver, ExtractOptions::default()).extract(&tree)
                                                                          .unwrap();
    let rules = RemapRules::new();
    let out = dir.path().join("retro");
    SymbolRemapper::new(&retro, &rules, RemapDirection::Retro).remap_tree(&tree, &map, &out)
                                                              .unwrap();
    let text = fs::read_to_string(out.join("net/minecraft/Foo.java")).unwrap();
    assert!(text.contains("int field_1_b;"));
    assert!(text.contains("void func_2_c(Foo other) { field_1_b = other.field_1_b; }"));
}
