use dca_conv2d::{
    ConvOptions, MatrixDataType, MatrixInfo, MatrixMemory, MatrixOp, MopMapping, SoftwareConv2d,
};

struct Ram(Vec<u8>);

impl MatrixMemory for Ram {
    fn read(&self, addr: u64, buf: &mut [u8]) {
        let start = addr as usize;
        buf.copy_from_slice(&self.0[start..start + buf.len()]);
    }

    fn write(&mut self, addr: u64, buf: &[u8]) {
        let start = addr as usize;
        self.0[start..start + buf.len()].copy_from_slice(buf);
    }
}

fn fill_i8(ram: &mut Ram, info: &MatrixInfo, f: impl Fn(u32, u32) -> i8) {
    for r in 0..info.num_row {
        for c in 0..info.num_col {
            ram.write(info.elem_addr(r, c), &f(r, c).to_le_bytes());
        }
    }
}

#[test]
fn software_backend_selected_at_startup() {
    let mi = MatrixInfo::new(0x000, 6, 6, MatrixDataType::Fixed8);
    let mk = MatrixInfo::new(0x100, 3, 3, MatrixDataType::Fixed8);
    let mut mo = MatrixInfo::new(0x200, 2, 2, MatrixDataType::Fixed32);

    let mut ram = Ram(vec![0; 0x400]);
    fill_i8(&mut ram, &mi, |r, c| (r * 6 + c) as i8);
    fill_i8(&mut ram, &mk, |r, c| if r == 1 && c == 1 { 1 } else { 0 });

    let sw: &'static SoftwareConv2d<Ram> = Box::leak(Box::new(SoftwareConv2d::new(ram)));

    let mut mop = MopMapping::new();
    mop.bind(MatrixOp::Conv2d, Box::new(sw));
    assert_eq!(mop.backend_name(MatrixOp::Conv2d), Some("SW"));

    let options = ConvOptions::new(3, 0).unwrap().bits();
    mop.matrix_conv(&mi, &mk, &mut mo, options).unwrap();

    let out: Vec<i32> = sw.with_memory(|ram| {
        (0..4)
            .map(|i| {
                let mut b = [0u8; 4];
                ram.read(mo.elem_addr(i / 2, i % 2), &mut b);
                i32::from_le_bytes(b)
            })
            .collect()
    });
    assert_eq!(out, vec![7, 10, 25, 28]);

    mop.unbind(MatrixOp::Conv2d);
    assert!(mop.matrix_conv(&mi, &mk, &mut mo, options).is_err());
}

#[test]
fn fixed8_products_accumulate_without_overflow() {
    let mi = MatrixInfo::new(0x000, 2, 2, MatrixDataType::Fixed8);
    let mk = MatrixInfo::new(0x010, 2, 2, MatrixDataType::Fixed8);
    let mut mo = MatrixInfo::new(0x020, 1, 1, MatrixDataType::Fixed32);

    let mut ram = Ram(vec![0; 0x40]);
    fill_i8(&mut ram, &mi, |_, _| -128);
    fill_i8(&mut ram, &mk, |_, _| 127);
    let sw = SoftwareConv2d::new(ram);

    dca_conv2d::MatrixConv::conv2d(&sw, &mi, &mk, &mut mo, 0).unwrap();

    let ram = sw.into_inner();
    let mut b = [0u8; 4];
    ram.read(0x020, &mut b);
    assert_eq!(i32::from_le_bytes(b), 4 * -128 * 127);
}
