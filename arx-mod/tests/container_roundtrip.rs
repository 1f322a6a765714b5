//! Whole-container round-trip: everything the writer emits must come back
//! byte-identical through the reader.

use arx_asm::Instruction;
use arx_mod::{
    class_id, method_id, ArxmodReader, ArxmodWriter, ClassDef, ClassEntry,
    ClassManifest, FieldEntry, MethodEntry, ModuleFlags, StringTable,
};

use proptest::prelude::*;

fn arb_instruction() -> impl Strategy<Value = Instruction> {
    (any::<u8>(), any::<u64>()).prop_map(|(repr, operand)| Instruction::from_parts(repr, operand))
}

fn arb_manifest() -> impl Strategy<Value = ClassManifest> {
    let name = "[A-Za-z][A-Za-z0-9]{0,14}";
    let class = (
        name,
        proptest::collection::vec((name, 0u32..8), 0..4),
        proptest::collection::vec((name, proptest::bool::ANY, 0u64..512), 0..4),
    );

    proptest::collection::vec(class, 0..4).prop_map(|classes| {
        let classes = classes
            .into_iter()
            .enumerate()
            .map(|(i, (cname, fields, methods))| {
                // Suffix with the index so generated class ids never collide.
                let cname = format!("{cname}{i}");
                let fields: Vec<FieldEntry> = fields
                    .into_iter()
                    .enumerate()
                    .map(|(j, (fname, type_id))| FieldEntry {
                        name: format!("{fname}{j}"),
                        type_id,
                        offset: j as u64 * 8,
                    })
                    .collect();
                let methods: Vec<MethodEntry> = methods
                    .into_iter()
                    .enumerate()
                    .map(|(j, (mname, is_function, offset))| {
                        let mname = format!("{mname}{j}");
                        let return_type = if is_function { "integer" } else { "" };
                        MethodEntry {
                            name: mname.clone(),
                            method_id: method_id("prop", &cname, &mname, "", return_type),
                            param_count: 0,
                            flags: 0,
                            param_types: String::new(),
                            return_type: return_type.to_string(),
                            offset,
                        }
                    })
                    .collect();
                ClassDef {
                    entry: ClassEntry {
                        name: cname.clone(),
                        class_id: class_id("prop", &cname),
                        parent_class_id: 0,
                        instance_size: fields.len() as u64 * 8,
                        flags: 0,
                    },
                    methods,
                    fields,
                }
            })
            .collect();
        ClassManifest { classes }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn read_of_write_is_identity(
        instructions in proptest::collection::vec(arb_instruction(), 0..64),
        literals in proptest::collection::vec("[ -~]{0,24}", 0..16),
        manifest in arb_manifest(),
        executable in proptest::bool::ANY,
        entry_point in 0u64..1024,
        app_name in "[a-z]{1,12}",
        app_payload in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut strings = StringTable::new();
        for s in &literals {
            strings.intern(s);
        }

        let flags = if executable {
            ModuleFlags::EXECUTABLE
        } else {
            ModuleFlags::LIBRARY
        };

        let mut w = ArxmodWriter::new();
        w.set_flags(flags)
            .set_entry_point(if executable { entry_point } else { 0 })
            .set_app(&app_name, app_payload.clone());
        w.code(&instructions).unwrap();
        w.strings(&strings).unwrap();
        w.classes(&manifest).unwrap();

        let reader = ArxmodReader::from_bytes(w.finalize().unwrap()).unwrap();

        prop_assert_eq!(reader.header().flags, flags);
        prop_assert_eq!(
            reader.header().entry_point,
            if executable { entry_point } else { 0 }
        );
        prop_assert_eq!(reader.code().unwrap(), instructions);
        prop_assert_eq!(reader.strings().unwrap(), strings);
        prop_assert_eq!(reader.classes().unwrap(), manifest);

        let app = reader.app().unwrap().unwrap();
        prop_assert_eq!(app.name, app_name);
        prop_assert_eq!(app.payload, app_payload);
    }
}
