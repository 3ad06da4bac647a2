fn main() {
    // Build timestamp exposed as leashkit::BUILD_DATE
    let build_date = chrono::Utc::now().format("%Y-%m-%dT%H:%MZ").to_string();
    println!("cargo:rustc-env=BUILD_DATE={}", build_date);
    println!("cargo:rerun-if-changed=build.rs");
}
