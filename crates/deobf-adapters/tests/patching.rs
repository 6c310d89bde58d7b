
use std::fs;

use deobf_adapters::{AdapterError, PatchSet, SourcePatcher};
use test_support::write;

const FOO: &str = "package net.minecraft;\n\nclass Foo {\n    int x = 1;\n}\n";

#[test]
fn failing_hunk_leaves_nothing_on_disk_and_names_file_and_hunk() {
    let dir = tempfile::tempdir().unwrap();
    let decompiled = dir.path().join("decomp");
    write(&decompiled, "net/minecraft/Foo.java", FOO.as_bytes());
    write(&decompiled, "net/minecraft/Bar.java", b"class Bar {}\n");
    let patches = dir.path().join("patches");
    write(&patches,
          "net/minecraft/Bar.java.patch",
          b"--- a/net/minecraft/Bar.java\n+++ b/net/minecraft/Bar.java\n@@ -1,1 +1,1 @@\n-class Bar {}\n+class Bar { }\n");
    write(&patches,
          "net/minecraft/Foo.java.patch",
          b"--- a/net/minecraft/Foo.java\n+++ b/net/minecraft/Foo.java\n@@ -3,3 +3,3 @@\n class Foo {\n-    int x = 7;\n+    int x = 8;\n }\n");

    let set = PatchSet::load(&patches).unwrap();
    assert_eq!(set.len(), 2);
    let output = dir.path().join("fixed");
    let err = SourcePatcher::default().run(&decompiled, &set, None, &output).unwrap_err();
    match err {
        AdapterError::PatchApplicationFailure { file, hunk, .. } => {
            assert_eq!(file, "net/minecraft/Foo.java");
            assert_eq!(hunk, 1);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!output.exists());
    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap()
                                                    .map(|e| e.unwrap().file_name().into_string().unwrap())
                                                    .collect();
    assert!(leftovers.iter().all(|n| !n.starts_with(".staging-")), "{leftovers:?}");
    assert_eq!(fs::read_to_string(decompiled.join("net/minecraft/Foo.java")).unwrap(), FOO);
}

#[test]
fn patches_then_injects_then_formats() {
    let dir = tempfile::tempdir().unwrap();
    let decompiled = dir.path().join("decomp");
    write(&decompiled, "net/minecraft/Foo.java", FOO.as_bytes());
    write(&decompiled, "assets/lang.txt", b"en_US\t\n");
    let patches = dir.path().join("patches");
    write(&patches,
          "Foo.java.patch",
          b"--- a/net/minecraft/Foo.java\n+++ b/net/minecraft/Foo.java\n@@ -3,3 +3,3 @@\n class Foo {\n-    int x = 1;\n+\tint x = 2;   \n }\n");
    let inject = dir.path().join("inject");
    write(&inject, "net/minecraft/Extra.java", b"package net.minecraft;\r\nclass Extra {}");

    let output = dir.path().join("fixed");
    let report = SourcePatcher::default().run(&decompiled, &PatchSet::load(&patches).unwrap(), Some(&inject), &output)
                                         .unwrap();
    assert_eq!((report.patched, report.injected, report.formatted), (1, 1, 2));
    assert_eq!(fs::read_to_string(output.join("net/minecraft/Foo.java")).unwrap(),
               "package net.minecraft;\n\nclass Foo {\n    int x = 2;\n}\n");
    assert_eq!(fs::read_to_string(output.join("net/minecraft/Extra.java")).unwrap(),
               "package net.minecraft;\nclass Extra {}\n");
    // los recursos no se formatean
    assert_eq!(fs::read(output.join("assets/lang.txt")).unwrap(), b"en_US\t\n");
}

#[test]
fn injection_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let decompiled = dir.path().join("decomp");
    write(&decompiled, "net/minecraft/Foo.java", FOO.as_bytes());
    let inject = dir.path().join("inject");
    write(&inject, "net/minecraft/Foo.java", b"class Foo {}\n");

    let output = dir.path().join("fixed");
    let err = SourcePatcher::default().run(&decompiled, &PatchSet::default(), Some(&inject), &output)
                                      .unwrap_err();
    assert!(matches!(err, AdapterError::PatchApplicationFailure { hunk: 0, .. }));
    assert!(!output.exists());
}
