use daqstream::core::{DaqError, SampleBlock};

#[test]
fn test_rows_transpose_channel_major_data() {
    let block = SampleBlock::new(vec![vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]]).unwrap();

    let rows: Vec<Vec<f64>> = block.rows().collect();
    assert_eq!(
        rows,
        vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]]
    );
}

#[test]
fn test_unequal_channels_are_malformed() {
    let result = SampleBlock::new(vec![vec![1.0, 2.0], vec![1.0]]);
    assert!(matches!(result, Err(DaqError::MalformedBlock(_))));

    assert!(SampleBlock::new(Vec::new()).is_err());
}

#[test]
fn test_single_channel_block() {
    let block = SampleBlock::single(vec![0.5, 0.25]);
    assert_eq!(block.num_channels(), 1);
    assert_eq!(block.samples_per_channel(), 2);
    assert_eq!(block.channel(0), Some(&[0.5, 0.25][..]));
    assert_eq!(block.channel(1), None);
}

#[test]
fn test_grouped_buffer_splits_per_channel() {
    let block = SampleBlock::from_grouped(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3).unwrap();
    assert_eq!(
        block.into_channels(),
        vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]
    );

    assert!(SampleBlock::from_grouped(vec![1.0, 2.0, 3.0], 2).is_err());
    assert!(SampleBlock::from_grouped(vec![1.0], 0).is_err());
}

#[test]
fn test_fill_row_reuses_buffer() {
    let block = SampleBlock::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    let mut row = vec![99.0; 5];

    block.fill_row(1, &mut row);
    assert_eq!(row, vec![2.0, 4.0]);
}
