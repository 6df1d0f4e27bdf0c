use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::{PathBuf,Path};
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

// Make a copy in temporary directory with the specified newline token.
// This insulates us against newline substitutions inserted by git or other layers.
// The starting newline must either be LF or CRLF.
fn copy_and_fix_newlines(in_file: PathBuf,temp_dir: &tempfile::TempDir,tok: &[u8]) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let txt = std::fs::read(in_file).expect("could not read input file");
    let mut new_txt: Vec<u8> = Vec::new();
    let mut last_char: u8 = 255;
    for i in 0..txt.len() {
        if txt[i]==13 || txt[i]==10 && last_char!=13 {
            new_txt.append(&mut tok.to_vec());
        }
        else if txt[i]!=10 {
            new_txt.push(txt[i]);
        }
        last_char = txt[i];
    }
    let new_txt_path = temp_dir.path().join("converted.txt");
    match std::fs::write(&new_txt_path,new_txt) {
        Ok(_) => Ok(new_txt_path),
        Err(e) => Err(Box::new(e))
    }
}

/// compress and expand a fixture with `method`, the result must match the fixture
fn round_trip_test(base_name: &str,method: &str) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path_any_newline = Path::new("tests").join([base_name,".txt"].concat());
    let in_path = copy_and_fix_newlines(in_path_any_newline,&temp_dir,&[10])?;
    let cmp_path = temp_dir.path().join([base_name,".",method].concat());
    let out_path = temp_dir.path().join([base_name,".out"].concat());
    Command::cargo_bin("classic_codecs")?
        .arg(method)
        .arg(&in_path)
        .arg(&cmp_path)
        .assert()
        .success()
        .stderr(predicate::str::starts_with("compressed"));
    Command::cargo_bin("classic_codecs")?
        .arg(method)
        .arg("-d")
        .arg(&cmp_path)
        .arg(&out_path)
        .assert()
        .success()
        .stderr(predicate::str::starts_with("expanded"));
    match (std::fs::read(in_path),std::fs::read(cmp_path),std::fs::read(out_path)) {
        (Ok(v1),Ok(c),Ok(v2)) => {
            assert!(c.len() < v1.len(),"{} did not compress",method);
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with reference")
    }
    Ok(())
}

#[test]
fn huffman_round_trip() -> STDRESULT {
    round_trip_test("hamlet_scene_1","huffman")
}

#[test]
fn lz77_round_trip() -> STDRESULT {
    round_trip_test("hamlet_scene_1","lz77")
}

#[test]
fn missing_input() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    for method in ["huffman","lz77"] {
        Command::cargo_bin("classic_codecs")?
            .arg(method)
            .arg(temp_dir.path().join("does_not_exist"))
            .arg(temp_dir.path().join("out"))
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Error"));
    }
    Ok(())
}

#[test]
fn empty_input() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("empty");
    std::fs::write(&in_path,b"")?;
    Command::cargo_bin("classic_codecs")?
        .arg("huffman")
        .arg(&in_path)
        .arg(temp_dir.path().join("empty.huffman"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("NoData"));
    Command::cargo_bin("classic_codecs")?
        .arg("lz77")
        .arg(&in_path)
        .arg(temp_dir.path().join("empty.lz77"))
        .assert()
        .success();
    assert_eq!(std::fs::read(temp_dir.path().join("empty.lz77"))?.len(),0);
    Ok(())
}

#[test]
fn wrong_arguments() -> STDRESULT {
    Command::cargo_bin("classic_codecs")?
        .arg("lz77")
        .arg("only_one_path")
        .assert()
        .failure();
    Ok(())
}
