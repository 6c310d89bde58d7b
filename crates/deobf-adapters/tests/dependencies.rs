
use std::fs;
use std::path::Path;

use deobf_adapters::classfile::{ClassBuilder, ClassFile};
use deobf_adapters::{AdapterError, DeclaredDependency, DependencyDescriptor, DependencyRemapper, ResolvedModule};
use deobf_mapping::{MappingTable, NameEntry, NameTables};
use deobf_persistence::FsArtifactStore;
use test_support::{write, StaticResolver};

const LIB_SRC: &str = "package net.example;\n\
                       public class Lib {\n\
                       \x20   public int field_1_b;\n\
                       \x20   public void func_2_c() { field_1_b++; }\n\
                       }\n";

fn table() -> MappingTable {
    let mut names = NameTables::default();
    names.fields.insert("field_1_b".into(), NameEntry::new("health"));
    names.methods.insert("func_2_c".into(), NameEntry::new("merge"));
    MappingTable::from_names(&names)
}

fn lib_bundle(root: &Path) {
    let class = ClassBuilder::new("net/example/Lib", "java/lang/Object").unwrap()
                                                                         .field(0x0001, "field_1_b", "I")
                                                                         .unwrap()
                                                                         .method(0x0001, "func_2_c", "()V")
                                                                         .unwrap()
                                                                         .member_ref(false, "net/example/Lib", "field_1_b", "I")
                                                                         .unwrap()
                                                                         .to_bytes();
    write(root, "net/example/Lib.class", &class);
}

fn resolver_with(lib: &DependencyDescriptor, bundle: &Path, sources: Vec<std::path::PathBuf>) -> StaticResolver {
    let mut resolver = StaticResolver::default();
    resolver.declared
            .insert("deobfCompile".into(), vec![DeclaredDependency::Module(lib.clone())]);
    resolver.modules.insert("deobfCompile".into(),
                            vec![ResolvedModule { descriptor: lib.clone(),
                                                  bundle: bundle.to_path_buf() }]);
    resolver.sources.insert(lib.clone(), sources);
    resolver
}

#[test]
fn module_is_published_under_deobf_group_with_sources() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("lib-1.0");
    lib_bundle(&bundle);
    let src = dir.path().join("lib-1.0-sources");
    write(&src, "net/example/Lib.java", LIB_SRC.as_bytes());
    let lib = DependencyDescriptor::new("com.example", "lib", "1.0");
    let resolver = resolver_with(&lib, &bundle, vec![src]);

    let deps = dir.path().join("deobfedDeps");
    let table = table();
    let resolved = DependencyRemapper::new(&table, "names-v1", &deps).remap_configuration(&resolver, "deobfCompile")
                                                                     .unwrap();
    assert_eq!(resolved.name, "deobfCompileResolved");
    assert_eq!(resolved.coordinates(), vec!["deobf.com.example:lib:1.0".to_string()]);

    let module = &resolved.modules[0];
    assert_eq!(module.binary, deps.join("deobf/com/example/lib/1.0/lib-1.0"));
    let class = ClassFile::parse(&fs::read(module.binary.join("net/example/Lib.class")).unwrap()).unwrap();
    assert_eq!(class.member_name(&class.fields[0]), Some("health"));
    assert_eq!(class.member_name(&class.methods[0]), Some("merge"));
    assert!(FsArtifactStore::recorded_fingerprint(&module.binary).is_some());

    let sources = module.sources.as_ref().unwrap();
    assert_eq!(sources, &deps.join("deobf/com/example/lib/1.0/lib-1.0-sources"));
    let text = fs::read_to_string(sources.join("net/example/Lib.java")).unwrap();
    assert!(text.contains("public int health;"));
    assert!(text.contains("public void merge() { health++; }"));
}

#[test]
fn first_sources_bundle_wins_and_none_means_binary_only() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("lib-1.0");
    lib_bundle(&bundle);
    let first = dir.path().join("first");
    write(&first, "net/example/Lib.java", LIB_SRC.as_bytes());
    let second = dir.path().join("second");
    write(&second, "net/example/Other.java", b"class Other {}\n");
    let lib = DependencyDescriptor::new("com.example", "lib", "1.0");
    let table = table();

    let deps = dir.path().join("deps");
    let resolved = DependencyRemapper::new(&table, "names-v1", &deps).remap_configuration(&resolver_with(&lib,
                                                                                                        &bundle,
                                                                                                        vec![first,
                                                                                                             second]),
                                                                                          "deobfCompile")
                                                                     .unwrap();
    let sources = resolved.modules[0].sources.clone().unwrap();
    assert!(sources.join("net/example/Lib.java").is_file());
    assert!(!sources.join("net/example/Other.java").exists());

    let bare = dir.path().join("bare");
    let resolved = DependencyRemapper::new(&table, "names-v1", &bare).remap_configuration(&resolver_with(&lib, &bundle, vec![]),
                                                                                          "deobfCompile")
                                                                     .unwrap();
    assert_eq!(resolved.modules[0].sources, None);
}

#[test]
fn raw_file_dependency_is_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("lib-1.0");
    lib_bundle(&bundle);
    let lib = DependencyDescriptor::new("com.example", "lib", "1.0");
    let mut resolver = resolver_with(&lib, &bundle, vec![]);
    resolver.declared
            .get_mut("deobfCompile")
            .unwrap()
            .push(DeclaredDependency::File(dir.path().join("libs/raw.jar")));

    let deps = dir.path().join("deps");
    let table = table();
    let err = DependencyRemapper::new(&table, "names-v1", &deps).remap_configuration(&resolver, "deobfCompile")
                                                                .unwrap_err();
    match err {
        AdapterError::InvalidDependencySource { configuration, dependency } => {
            assert_eq!(configuration, "deobfCompile");
            assert!(dependency.ends_with("raw.jar"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!deps.exists());
}
