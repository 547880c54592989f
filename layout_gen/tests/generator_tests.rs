/* End-to-end generator tests: schema document in, TypeScript out. */

use layout_gen::cmds::common::{analyze_and_plan, load_model};
use layout_gen::dispatch::build_dispatch_tables;
use layout_gen::codegen::ts::{TypeScriptCodeGenerator, TypeScriptCodeGeneratorOptions};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

const TRANSFER_SCHEMA: &str = r#"
schema:
  name: "test.transactions"
  description: "transfer fixture"
types:
  - name: "Amount"
    type: "byte"
    size: 8
    comments: "native currency amount"
  - name: "NetworkType"
    type: "enum"
    size: 1
    values:
      - name: "MAINNET"
        value: 104
      - name: "TESTNET"
        value: 152
  - name: "TransactionType"
    type: "enum"
    size: 2
    values:
      - name: "TRANSFER"
        value: 16724
  - name: "SizePrefixedEntity"
    type: "struct"
    layout:
      - name: "size"
        type: "byte"
        size: 4
  - name: "EntityBody"
    type: "struct"
    layout:
      - name: "version"
        type: "byte"
        size: 1
      - name: "network"
        type: "NetworkType"
      - name: "type"
        type: "TransactionType"
  - name: "Transaction"
    type: "struct"
    layout:
      - type: "SizePrefixedEntity"
        disposition: "inline"
      - type: "EntityBody"
        disposition: "inline"
  - name: "Mosaic"
    type: "struct"
    layout:
      - name: "amount"
        type: "Amount"
  - name: "TransferTransaction"
    type: "struct"
    comments: "transfer transaction"
    layout:
      - name: "transaction"
        type: "Transaction"
        disposition: "inline"
      - name: "TRANSACTION_TYPE"
        type: "TransactionType"
        disposition: "const"
        value: "TRANSFER"
      - name: "TRANSACTION_VERSION"
        type: "byte"
        size: 1
        disposition: "const"
        value: 1
      - name: "mosaics_count"
        type: "byte"
        size: 1
      - name: "mosaics"
        type: "[Mosaic]"
        disposition: "array"
        size: "mosaics_count"
        sort-key: "amount"
"#;

fn write_schema(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn temp_output(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("layout_gen_{}_{}", tag, std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    dir
}

#[test]
fn schema_document_compiles_to_typescript() {
    let schema = write_schema(TRANSFER_SCHEMA);
    let files = vec![schema.path().to_path_buf()];

    let (model, _) = load_model(&files).unwrap();
    let plans = analyze_and_plan(&model, false).unwrap();
    let tables = build_dispatch_tables(&model);

    /* Markers are spliced, everything else gets a plan. */
    assert!(plans.type_plan("SizePrefixedEntity").is_none());
    assert!(plans.type_plan("Transaction").is_some());
    assert!(plans.type_plan("TransferTransaction").is_some());
    assert_eq!(plans.enums.len(), 2);
    assert_eq!(tables[0].lookup(16724, 1).unwrap().type_name, "TransferTransaction");

    let output_dir = temp_output("emit");
    let generator = TypeScriptCodeGenerator::new(TypeScriptCodeGeneratorOptions {
        output_dir: output_dir.clone(),
        license_header: None,
    });
    generator.emit_code(&plans, &tables).unwrap();

    let transfer = fs::read_to_string(output_dir.join("TransferTransaction.ts")).unwrap();
    assert!(transfer.contains("import { Transaction } from './Transaction';"));
    assert!(transfer.contains("export class TransferTransaction extends Transaction implements Serializer {"));
    assert!(transfer.contains("super({ version, network, type });"));
    assert!(transfer.contains("const superObject = Transaction.deserialize(Uint8Array.from(byteArray));"));
    assert!(transfer.contains("const mosaicsCount = Utils.bufferToUint8(Uint8Array.from(byteArray));"));
    assert!(transfer
        .contains("const mosaics = Utils.deserialize(Mosaic.deserialize, Uint8Array.from(byteArray), mosaicsCount);"));
    /* Const entries re-emit their literal; counts are recomputed. */
    assert!(transfer.contains("Utils.uint16ToBuffer(16724)"));
    assert!(transfer.contains("Utils.uint8ToBuffer(this.mosaics.length)"));
    assert!(transfer.contains("size += super.size; // transaction"));

    let helper = fs::read_to_string(output_dir.join("TransactionHelper.ts")).unwrap();
    assert!(helper.contains("if (header.type === 16724 && header.version === 1) {"));

    let network = fs::read_to_string(output_dir.join("NetworkType.ts")).unwrap();
    assert!(network.contains("export enum NetworkType {"));
    assert!(network.contains("MAINNET = 104,"));

    assert!(output_dir.join("Utils.ts").exists());
    assert!(output_dir.join("Serializer.ts").exists());

    fs::remove_dir_all(&output_dir).unwrap();
}

#[test]
fn malformed_type_does_not_block_the_rest() {
    let schema = write_schema(
        r#"
schema:
  name: "test.partial"
types:
  - name: "Good"
    type: "struct"
    layout:
      - name: "value"
        type: "byte"
        size: 4
  - name: "Bad"
    type: "struct"
    layout:
      - name: "what"
        type: "MissingType"
"#,
    );
    let files = vec![schema.path().to_path_buf()];
    let (model, _) = load_model(&files).unwrap();
    let plans = analyze_and_plan(&model, false).unwrap();

    assert!(plans.type_plan("Good").is_some());
    assert!(plans.type_plan("Bad").is_none());
}

#[test]
fn generate_command_writes_output() {
    let schema = write_schema(TRANSFER_SCHEMA);
    let output_dir = temp_output("cmd");

    layout_gen::cmds::generate::run(
        vec![schema.path().to_path_buf()],
        output_dir.clone(),
        false,
    )
    .unwrap();

    assert!(output_dir.join("TransferTransaction.ts").exists());
    assert!(output_dir.join("Mosaic.ts").exists());
    fs::remove_dir_all(&output_dir).unwrap();
}
