fn main() {
    for path in ["res/examples/**/*.plm", "benches/lang/*.plm"] {
        build_deps::rerun_if_changed_paths(path).expect("could not read path");
    }
}
