//! Build script for mediadupe.
//!
//! On Windows, embeds an application manifest declaring `longPathAware` so
//! deep media libraries beyond 260-character paths can be scanned. Other
//! platforms need nothing.

fn main() {
    #[cfg(windows)]
    {
        embed_resource::compile("mediadupe.rc", embed_resource::NONE);

        println!("cargo:rerun-if-changed=mediadupe.rc");
        println!("cargo:rerun-if-changed=mediadupe.manifest");
    }
}
