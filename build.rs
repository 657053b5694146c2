//! This build script copies the `memory.x` file from the crate root into
//! a directory where the linker can always find it at build time, but only
//! when building the ESP32-S3 image. Host builds (the library and its tests)
//! do not link against it.
//!
//! It also records the firmware version, which core 0 prints when it comes up,
//! and stages the ULP coprocessor program. When building that program for the
//! ULP RISC-V itself, it places `ulp.x` instead.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
	let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

	if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("xtensa") {
		// Put `memory.x` in our output directory and ensure it's
		// on the linker search path.
		File::create(out.join("memory.x"))
			.unwrap()
			.write_all(include_bytes!("memory.x"))
			.unwrap();
		println!("cargo:rustc-link-search={}", out.display());
	}

	if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("riscv32") {
		File::create(out.join("ulp.x"))
			.unwrap()
			.write_all(include_bytes!("ulp.x"))
			.unwrap();
		println!("cargo:rustc-link-search={}", out.display());
		println!("cargo:rustc-link-arg-bin=esp32s3-bringup-ulp=-Tulp.x");
	}

	// By specifying `memory.x` here, we ensure the build script is only
	// re-run when `memory.x` is changed.
	println!("cargo:rerun-if-changed=memory.x");
	println!("cargo:rerun-if-changed=ulp.x");
	println!("cargo:rerun-if-changed=.git/HEAD");

	// Generate a file containing the firmware version
	let mut output = None;
	if let Ok(version_output) = std::process::Command::new("git")
		.current_dir(env::var_os("CARGO_MANIFEST_DIR").unwrap())
		.args(["describe", "--tags", "--dirty"])
		.output()
	{
		if version_output.status.success() {
			let mut stdout = version_output.stdout;
			// Remove the trailing newline
			stdout.pop();
			output = Some(stdout);
		} else {
			println!("Error is {:?}", std::str::from_utf8(&version_output.stderr));
		}
	}
	let output = output.unwrap_or_else(|| String::from(env!("CARGO_PKG_VERSION")).into_bytes());

	// Write the file
	std::fs::write(out.join("version.txt"), output).expect("writing version file");

	// The ULP program is built on its own, for a different CPU. Point
	// `ULP_IMAGE` at the flat binary and it gets loaded by core 0.
	println!("cargo:rerun-if-env-changed=ULP_IMAGE");
	let firmware_with_coprocessor = env::var_os("CARGO_FEATURE_COPROCESSOR").is_some()
		&& env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("xtensa");
	let image = match env::var_os("ULP_IMAGE") {
		Some(path) => std::fs::read(path).expect("reading ULP_IMAGE"),
		None if firmware_with_coprocessor => {
			panic!("the coprocessor feature needs ULP_IMAGE set to the ULP program's flat binary");
		}
		None => Vec::new(),
	};
	if firmware_with_coprocessor && image.is_empty() {
		panic!("ULP_IMAGE is empty");
	}
	std::fs::write(out.join("ulp.bin"), image).expect("writing ULP image");
}
