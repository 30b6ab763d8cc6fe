//! OpenGEX text document assembly
//!
//! The whole document is built in an in-memory buffer and only surrendered
//! when export succeeds, so a failed export never leaves a partial file.
//! Indentation is tabs. Integers print decimal; floats print either fixed
//! six-decimal or as hex IEEE-754 bits, with non-finite values forced to
//! zero in both modes.

use std::fmt::Write as _;

use scenegex_core::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Line chunk sizes for the long array forms.
const INTS_PER_LINE: usize = 64;
const FLOATS_PER_LINE: usize = 16;
const VECTORS_PER_LINE: usize = 8;
const TRIANGLES_PER_LINE: usize = 16;

/// Append-only text buffer with tab indentation state.
pub struct OgexWriter {
    out: String,
    indent: usize,
    hex_floats: bool,
}

impl OgexWriter {
    pub fn new(hex_floats: bool) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            hex_floats,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out.into_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn inc_indent(&mut self) {
        self.indent += 1;
    }

    pub fn dec_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Raw append with no indentation.
    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Append `text` on a fresh indented position. `extra` adds to the
    /// current indent level; `newline_before` inserts a blank separator
    /// line first.
    pub fn indent_write(&mut self, text: &str, extra: usize, newline_before: bool) {
        if newline_before {
            self.out.push('\n');
        }
        for _ in 0..self.indent + extra {
            self.out.push('\t');
        }
        self.out.push_str(text);
    }

    pub fn write_int(&mut self, value: i64) {
        let _ = write!(self.out, "{value}");
    }

    pub fn write_float(&mut self, value: f32) {
        if self.hex_floats {
            let bits = if value.is_finite() { value.to_bits() } else { 0 };
            let _ = write!(self.out, "0x{bits:08x}");
        } else {
            let value = if value.is_finite() { value } else { 0.0 };
            let _ = write!(self.out, "{value:.6}");
        }
    }

    pub fn write_color(&mut self, color: [f32; 3]) {
        self.out.push('{');
        self.write_float(color[0]);
        self.write(", ");
        self.write_float(color[1]);
        self.write(", ");
        self.write_float(color[2]);
        self.out.push('}');
    }

    pub fn write_vector2(&mut self, v: Vec2) {
        self.out.push('{');
        self.write_float(v.x);
        self.write(", ");
        self.write_float(v.y);
        self.out.push('}');
    }

    pub fn write_vector3(&mut self, v: Vec3) {
        self.write_color(v.to_array());
    }

    pub fn write_vector4(&mut self, v: Vec4) {
        self.out.push('{');
        let [x, y, z, w] = v.to_array();
        self.write_float(x);
        self.write(", ");
        self.write_float(y);
        self.write(", ");
        self.write_float(z);
        self.write(", ");
        self.write_float(w);
        self.out.push('}');
    }

    /// Quaternion components in x, y, z, w document order.
    pub fn write_quaternion(&mut self, q: Quat) {
        self.write_vector4(Vec4::new(q.x, q.y, q.z, q.w));
    }

    /// Matrix in column-major order across four indented lines.
    pub fn write_matrix(&mut self, m: &Mat4) {
        for col in 0..4 {
            if col == 0 {
                self.indent_write("{", 1, false);
            } else {
                self.indent_write(" ", 1, false);
            }
            for row in 0..4 {
                if row > 0 {
                    self.write(", ");
                }
                self.write_float(m.m[row][col]);
            }
            if col < 3 {
                self.write(",\n");
            } else {
                self.write("}\n");
            }
        }
    }

    /// Matrix in column-major order on a single indented line, without a
    /// trailing newline.
    pub fn write_matrix_flat(&mut self, m: &Mat4) {
        self.indent_write("{", 1, false);
        let mut first = true;
        for col in 0..4 {
            for row in 0..4 {
                if !first {
                    self.write(", ");
                }
                self.write_float(m.m[row][col]);
                first = false;
            }
        }
        self.out.push('}');
    }

    /// Comma-newline separated flat matrices, one per line.
    pub fn write_matrix_array(&mut self, matrices: &[Mat4]) {
        for (i, m) in matrices.iter().enumerate() {
            self.write_matrix_flat(m);
            if i + 1 < matrices.len() {
                self.write(",\n");
            } else {
                self.write("\n");
            }
        }
    }

    /// File reference: backslashes become slashes, and a Windows drive
    /// letter prefix `X:` becomes `//X`.
    pub fn write_file_name(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let bytes = name.as_bytes();
        if name.len() > 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
            self.write("//");
            self.out.push(bytes[0] as char);
            let rest = name[2..].replace('\\', "/");
            self.write(&rest);
        } else {
            let fixed = name.replace('\\', "/");
            self.write(&fixed);
        }
    }

    fn write_chunked<T: Copy>(
        &mut self,
        values: &[T],
        per_line: usize,
        mut emit: impl FnMut(&mut Self, T),
    ) {
        let count = values.len();
        for (i, &value) in values.iter().enumerate() {
            if i % per_line == 0 {
                self.indent_write("", 1, false);
            }
            emit(self, value);
            if i + 1 == count {
                self.write("\n");
            } else if (i + 1) % per_line == 0 {
                self.write(",\n");
            } else {
                self.write(", ");
            }
        }
    }

    pub fn write_int_array(&mut self, values: &[u32]) {
        self.write_chunked(values, INTS_PER_LINE, |w, v| w.write_int(i64::from(v)));
    }

    pub fn write_float_array(&mut self, values: &[f32]) {
        self.write_chunked(values, FLOATS_PER_LINE, |w, v| w.write_float(v));
    }

    pub fn write_vector2_array(&mut self, values: &[Vec2]) {
        self.write_chunked(values, VECTORS_PER_LINE, |w, v| w.write_vector2(v));
    }

    pub fn write_vector3_array(&mut self, values: &[Vec3]) {
        self.write_chunked(values, VECTORS_PER_LINE, |w, v| w.write_vector3(v));
    }

    pub fn write_triangle_array(&mut self, triangles: &[[u32; 3]]) {
        self.write_chunked(triangles, TRIANGLES_PER_LINE, |w, t| {
            w.out.push('{');
            w.write_int(i64::from(t[0]));
            w.write(", ");
            w.write_int(i64::from(t[1]));
            w.write(", ");
            w.write_int(i64::from(t[2]));
            w.out.push('}');
        });
    }
}
