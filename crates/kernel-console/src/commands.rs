//! Per-kernel source snippets for console conveniences.
//!
//! Kernels that are not recognised fall back to IPython magics.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KernelFamily {
    Python,
    R,
    Julia,
    Deno,
}

fn family(kernel: &str) -> KernelFamily {
    let kernel = kernel.to_lowercase();
    if kernel == "ir" {
        KernelFamily::R
    } else if kernel.starts_with("julia") {
        KernelFamily::Julia
    } else if kernel == "deno" {
        KernelFamily::Deno
    } else {
        KernelFamily::Python
    }
}

/// Code that changes the kernel's working directory to `path`.
pub fn change_dir_command(kernel: &str, path: &str) -> String {
    match family(kernel) {
        KernelFamily::Python => format!("%cd \"{}\"", path),
        KernelFamily::R => format!("setwd(\"{}\")", path),
        KernelFamily::Julia => format!("cd(\"{}\")", path),
        KernelFamily::Deno => format!("Deno.chdir(\"{}\")", path),
    }
}

/// Code that runs the script at `path` inside the kernel.
pub fn run_file_command(kernel: &str, path: &str) -> String {
    match family(kernel) {
        KernelFamily::Python => format!("%run \"{}\"", path),
        KernelFamily::R => format!("source(\"{}\")", path),
        KernelFamily::Julia => format!("include(\"{}\")", path),
        KernelFamily::Deno => format!("await import(\"{}\")", path),
    }
}
