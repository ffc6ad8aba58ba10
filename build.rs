fn main() {
    lalrpop::process_root().expect("lalrpop failed to process grammar files");
    println!("cargo:rerun-if-changed=src/grammar.lalrpop");
}
